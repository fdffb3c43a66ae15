//! Plain-record authentication state persisted between launches.
//!
//! [`AuthState`] carries no behavior beyond derived views; every mutation that must be persisted
//! goes through [`AuthStateStore`](crate::store::AuthStateStore).

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenResponse, TokenSecret},
	discovery::ServiceConfiguration,
	id_token::IdToken,
};

/// Outcome of a completed authorization request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
	/// Authorization code returned on the redirect.
	pub code: TokenSecret,
	/// `state` value returned on the redirect.
	pub state: String,
	/// Nonce sent with the request.
	pub nonce: String,
	/// Redirect URI the request was issued with.
	pub redirect_uri: Url,
	/// PKCE verifier paired with the request's challenge.
	pub code_verifier: TokenSecret,
	/// Front-channel ID token returned by a hybrid flow.
	pub id_token: Option<TokenSecret>,
	/// Scopes requested.
	pub scope: ScopeSet,
}

/// Current authentication state for one client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthState {
	/// Provider metadata the state is bound to.
	pub configuration: ServiceConfiguration,
	/// Most recent authorization response.
	pub last_authorization_response: Option<AuthorizationResponse>,
	/// Most recent token response.
	pub last_token_response: Option<TokenResponse>,
	/// Authorization error recorded by a failed refresh.
	pub authorization_error: Option<String>,
}
impl AuthState {
	/// Creates an empty state bound to `configuration`.
	pub fn new(configuration: ServiceConfiguration) -> Self {
		Self {
			configuration,
			last_authorization_response: None,
			last_token_response: None,
			authorization_error: None,
		}
	}

	/// Creates a state holding a completed authorization.
	pub fn authorized(
		configuration: ServiceConfiguration,
		authorization: AuthorizationResponse,
		token_response: Option<TokenResponse>,
	) -> Self {
		Self {
			configuration,
			last_authorization_response: Some(authorization),
			last_token_response: token_response,
			authorization_error: None,
		}
	}

	/// Issuer of the bound configuration.
	pub fn issuer(&self) -> &Url {
		&self.configuration.issuer
	}

	/// Returns `true` when a token response exists and no authorization error was recorded.
	pub fn is_authorized(&self) -> bool {
		self.last_token_response.is_some() && self.authorization_error.is_none()
	}

	/// Refresh token of the last token response.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.last_token_response.as_ref()?.refresh_token.as_ref()
	}

	/// Latest ID token, preferring the token endpoint's over the front channel's.
	pub fn id_token(&self) -> Option<&TokenSecret> {
		self.last_token_response
			.as_ref()
			.and_then(|response| response.id_token.as_ref())
			.or_else(|| self.last_authorization_response.as_ref()?.id_token.as_ref())
	}

	/// Claims of the latest ID token, when it can be parsed.
	pub fn claims(&self) -> Option<JsonMap<String, JsonValue>> {
		IdToken::parse(self.id_token()?.expose()).ok().map(IdToken::into_claims)
	}

	/// Applies a refresh response.
	///
	/// A refresh response that omits the refresh or ID token keeps the previous ones, and a
	/// successful refresh clears any recorded authorization error.
	pub fn apply_refresh(&mut self, mut response: TokenResponse) {
		if let Some(previous) = self.last_token_response.take() {
			if response.refresh_token.is_none() {
				response.refresh_token = previous.refresh_token;
			}
			if response.id_token.is_none() {
				response.id_token = previous.id_token;
			}
		}

		self.last_token_response = Some(response);
		self.authorization_error = None;
	}
}
