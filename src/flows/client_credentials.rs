//! Client Credentials grant for machine-to-machine access tokens.
//!
//! The token is requested for `audience = domain` and handed straight to the caller; it is never
//! written to the auth state, which belongs to the end-user session.

// self
use crate::{
	_prelude::*,
	auth::TokenResponse,
	flows::AuthClient,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{FlowKind, FlowSpan},
};

impl<C, M> AuthClient<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Performs the `client_credentials` grant against the discovered token endpoint.
	pub async fn request_client_credentials_token(&self) -> Result<TokenResponse> {
		FlowSpan::new(FlowKind::ClientCredentials, "request_client_credentials_token")
			.observe(async {
				let configuration = self.configuration_or_discover().await?;
				let _barrier = self.barrier.lock().await;

				self.token_endpoint(&configuration.token_endpoint)?
					.client_credentials(&self.config.domain)
					.await
			})
			.await
	}
}
