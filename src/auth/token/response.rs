//! Token endpoint responses, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, token::secret::TokenSecret},
};

/// Current lifecycle status for an access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is not yet valid because the issued-at instant is in the future.
	Pending,
	/// Token is currently valid.
	Active,
	/// Token exceeded its expiry instant.
	Expired,
}

/// Errors produced by [`TokenResponseBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenResponseBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when the relative expiry overflows the issued instant.
	#[error("Expiry instant is out of range.")]
	ExpiryOutOfRange,
}

/// Tokens returned by the token endpoint for an exchange or refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Compact ID token, if the provider issued one.
	pub id_token: Option<TokenSecret>,
	/// Scopes reported by the provider, when it reported any.
	pub scope: Option<ScopeSet>,
	/// Instant the response was received.
	pub issued_at: OffsetDateTime,
	/// Access token expiry; `None` when the provider omitted `expires_in`.
	pub expires_at: Option<OffsetDateTime>,
	/// Response members without a dedicated field.
	#[serde(default)]
	pub additional_parameters: BTreeMap<String, JsonValue>,
}
impl TokenResponse {
	/// Returns a builder for token responses.
	pub fn builder() -> TokenResponseBuilder {
		TokenResponseBuilder::default()
	}

	/// Computes the access token status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.issued_at {
			return TokenStatus::Pending;
		}
		if self.expires_at.is_some_and(|expires_at| instant >= expires_at) {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Returns `true` when the access token expires within `window` of `instant`.
	pub fn expires_within(&self, instant: OffsetDateTime, window: Duration) -> bool {
		self.expires_at.is_some_and(|expires_at| {
			instant.checked_add(window).is_none_or(|deadline| deadline >= expires_at)
		})
	}
}
impl Debug for TokenResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResponse")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("additional_parameters", &self.additional_parameters.keys())
			.finish()
	}
}

/// Builder for [`TokenResponse`].
#[derive(Clone, Debug, Default)]
pub struct TokenResponseBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	id_token: Option<TokenSecret>,
	scope: Option<ScopeSet>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	additional_parameters: BTreeMap<String, JsonValue>,
}
impl TokenResponseBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the compact ID token.
	pub fn id_token(mut self, token: impl Into<String>) -> Self {
		self.id_token = Some(TokenSecret::new(token));

		self
	}

	/// Records the scopes granted by the provider.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Adds a response member without a dedicated field.
	pub fn additional_parameter(mut self, key: impl Into<String>, value: JsonValue) -> Self {
		self.additional_parameters.insert(key.into(), value);

		self
	}

	/// Consumes the builder and produces a [`TokenResponse`].
	pub fn build(self) -> Result<TokenResponse, TokenResponseBuilderError> {
		let access_token =
			self.access_token.ok_or(TokenResponseBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) => Some(
				issued_at.checked_add(delta).ok_or(TokenResponseBuilderError::ExpiryOutOfRange)?,
			),
			(None, None) => None,
		};

		Ok(TokenResponse {
			access_token,
			refresh_token: self.refresh_token,
			id_token: self.id_token,
			scope: self.scope,
			issued_at,
			expires_at,
			additional_parameters: self.additional_parameters,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn status_transitions_cover_all_states() {
		let response = TokenResponse::builder()
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token response builder should succeed.");

		assert_eq!(response.status_at(macros::datetime!(2024-12-31 23:59 UTC)), TokenStatus::Pending);
		assert_eq!(response.status_at(macros::datetime!(2025-01-01 00:30 UTC)), TokenStatus::Active);
		assert_eq!(response.status_at(macros::datetime!(2025-01-01 01:00 UTC)), TokenStatus::Expired);
	}

	#[test]
	fn missing_expiry_never_expires() {
		let response = TokenResponse::builder()
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.build()
			.expect("Expiry is optional.");

		assert_eq!(response.expires_at, None);
		assert_eq!(response.status_at(macros::datetime!(2030-01-01 00:00 UTC)), TokenStatus::Active);
		assert!(!response.expires_within(macros::datetime!(2030-01-01 00:00 UTC), Duration::DAY));
	}

	#[test]
	fn relative_expiry_and_refresh_window() {
		let response = TokenResponse::builder()
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Relative expiry should build.");

		assert_eq!(response.expires_at, Some(macros::datetime!(2025-01-01 00:30 UTC)));
		assert!(!response.expires_within(macros::datetime!(2025-01-01 00:28 UTC), Duration::MINUTE));
		assert!(response.expires_within(macros::datetime!(2025-01-01 00:29 UTC), Duration::MINUTE));
	}

	#[test]
	fn access_token_is_required_and_redacted() {
		assert_eq!(
			TokenResponse::builder().build().map(|_| ()),
			Err(TokenResponseBuilderError::MissingAccessToken)
		);
		assert_eq!(
			TokenResponse::builder()
				.access_token("a")
				.issued_at(OffsetDateTime::now_utc())
				.expires_in(Duration::seconds(9_000_000_000_000))
				.build()
				.map(|_| ()),
			Err(TokenResponseBuilderError::ExpiryOutOfRange)
		);

		let response = TokenResponse::builder()
			.access_token("super-secret")
			.refresh_token("refresh-secret")
			.additional_parameter("token_type", JsonValue::from("Bearer"))
			.build()
			.expect("Token response should build.");
		let rendered = format!("{response:?}");

		assert!(!rendered.contains("super-secret"));
		assert!(!rendered.contains("refresh-secret"));
		assert!(rendered.contains("token_type"));
	}
}
