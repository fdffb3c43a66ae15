//! Token reads with transparent refresh.
//!
//! Every read goes through one refresh-if-needed step: the stored access token is returned while
//! it stays outside the request's preemptive window, and otherwise a `grant_type=refresh_token`
//! call replaces it. An `invalid_grant` answer is recorded in the auth state, which then stays
//! unauthorized until a new authorization replaces it.

// self
use crate::{
	_prelude::*,
	auth::{TokenResponse, TokenSecret},
	error::ConfigError,
	flows::{AuthClient, RefreshRequest},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{FlowKind, FlowSpan},
};

impl<C, M> AuthClient<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a valid access token, refreshing it first when needed.
	pub async fn get_access_token(&self, request: &RefreshRequest) -> Result<TokenSecret> {
		FlowSpan::new(FlowKind::Refresh, "get_access_token")
			.observe(async { self.refresh_if_needed(request).await.map(|response| response.access_token) })
			.await
	}

	/// Returns `true` when a valid access token exists or could be refreshed.
	pub async fn check_authenticated(&self, request: &RefreshRequest) -> bool {
		match self.refresh_if_needed(request).await {
			Ok(_) => true,
			Err(e) => {
				flow_event!(debug, error = %e, "Session is not authenticated.");

				let _ = e;

				false
			},
		}
	}

	/// Claims of the latest stored ID token.
	pub async fn last_retrieved_claims(&self) -> Option<JsonMap<String, JsonValue>> {
		self.state_store.get().await?.claims()
	}

	/// Non-standard members of the latest token response.
	pub async fn last_token_response_additional_parameters(
		&self,
	) -> Option<BTreeMap<String, JsonValue>> {
		Some(self.state_store.get().await?.last_token_response?.additional_parameters)
	}

	pub(super) async fn refresh_if_needed(&self, request: &RefreshRequest) -> Result<TokenResponse> {
		let _barrier = self.barrier.lock().await;
		let state = self.state_store.get().await.ok_or(Error::StateMissing)?;

		if let Some(reason) = &state.authorization_error {
			return Err(Error::InvalidGrant { reason: reason.clone() });
		}

		let current = state.last_token_response.as_ref().ok_or(Error::TokenResponseMissing)?;

		if !request.should_refresh(current, OffsetDateTime::now_utc()) {
			return Ok(current.clone());
		}

		let refresh_token = state.refresh_token().ok_or(ConfigError::MissingRefreshToken)?;
		let refreshed = self
			.token_endpoint(&state.configuration.token_endpoint)?
			.refresh(refresh_token.expose(), &request.parameters)
			.await;

		match refreshed {
			Ok(response) => self
				.state_store
				.update_from_refresh(Some(response), None)
				.await
				.and_then(|state| state.last_token_response)
				.ok_or(Error::StateMissing),
			Err(Error::InvalidGrant { reason }) => {
				flow_event!(warn, reason = %reason, "Refresh token rejected; session is no longer authorized.");

				self.state_store.update_from_refresh(None, Some(reason.clone())).await;

				Err(Error::InvalidGrant { reason })
			},
			Err(e) => Err(e),
		}
	}
}
