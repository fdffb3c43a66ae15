//! Client-level error types shared across flows, validation, and transports.

// self
use crate::{_prelude::*, id_token::ValidationError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// ID token failed validation; the flow must be treated as unauthenticated.
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// OpenID configuration could not be discovered for the issuer.
	#[error("OpenID configuration discovery failed for {issuer}.")]
	DiscoveryFailed {
		/// Issuer the discovery document was requested for.
		issuer: String,
		/// Transport or document parsing failure.
		#[source]
		source: BoxError,
	},
	/// Redirect URI cannot be used for authorization requests.
	#[error("Redirect URI is invalid: {uri}.")]
	InvalidRedirectUri {
		/// Offending redirect URI.
		uri: String,
	},
	/// Domain cannot be turned into an HTTPS issuer URL.
	#[error("Domain does not form a valid issuer URL: {domain}.")]
	InvalidDomainUrl {
		/// Offending domain.
		domain: String,
	},
	/// External user agent could not be presented.
	#[error("External user agent could not be created: {reason}.")]
	UserAgentCreationFailed {
		/// Agent-supplied reason string.
		reason: String,
	},
	/// End-user dismissed the external user agent.
	#[error("User canceled the authorization request.")]
	UserCanceled,
	/// A newer authorization request replaced this one before its redirect arrived.
	#[error("Authorization request was superseded by a newer flow.")]
	AuthorizationSuperseded,
	/// Returned `state` does not match the request.
	#[error("Authorization response state does not match the request.")]
	StateMismatch,
	/// Authorization server redirected back with an OAuth error.
	#[error("Authorization server rejected the request: {error}.")]
	AuthorizationRejected {
		/// OAuth `error` code.
		error: String,
		/// OAuth `error_description`, when supplied.
		description: Option<String>,
	},
	/// Authorization response carries nothing that can be exchanged for tokens.
	#[error("Authorization response does not contain an exchangeable authorization code.")]
	TokenExchangeRequestMissing,
	/// No authentication state is available.
	#[error("No authentication state is available.")]
	StateMissing,
	/// Authentication state exists but holds no token response.
	#[error("Authentication state does not contain a token response.")]
	TokenResponseMissing,
	/// Revocation endpoint did not confirm the revocation.
	#[error("Token revocation failed: {reason}.")]
	RevocationFailed {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Provider- or client-supplied reason string.
		reason: String,
	},
	/// Biometric gating was requested without an authenticator.
	#[error("Biometric authenticator is unavailable.")]
	BiometricUnavailable,
	/// Device cannot perform biometric authentication.
	#[error("Biometric authentication is not supported on this device.")]
	BiometricNotSupported,
	/// End-user failed the biometric prompt.
	#[error("Biometric authentication failed.")]
	BiometricAuthenticationFailed,
	/// Provider rejected the grant (e.g., bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or client-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or client-supplied reason string.
		reason: String,
	},
}
impl Error {
	/// Returns `true` for failures that indicate a protocol violation or tampering.
	pub fn is_security_relevant(&self) -> bool {
		matches!(self, Self::StateMismatch | Self::Validation(_))
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Discovered endpoint is not a usable URL.
	#[error("Discovered endpoint is invalid.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Redirect URI cannot be parsed by the token client.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Revocation request could not be built (e.g., insecure endpoint).
	#[error(transparent)]
	Revocation(#[from] oauth2::ConfigurationError),
	/// Configured client identifier is empty.
	#[error("Client identifier is required.")]
	MissingClientId,
	/// Cached token response is missing a refresh secret.
	#[error("Token response is missing a refresh token.")]
	MissingRefreshToken,
	/// Scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token response builder validation failed.
	#[error("Unable to build token response.")]
	TokenBuild(#[from] crate::auth::TokenResponseBuilderError),
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or client-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO, unexpected HTTP status).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// Provider answered a document request with a non-success status.
	#[error("Provider responded with HTTP status {status}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
