//! Token endpoint facade over the `oauth2` crate.
//!
//! Every token endpoint interaction (code exchange, refresh, client credentials, revocation)
//! goes through [`TokenEndpoint`], which pairs a configured `oauth2` client with the caller's
//! [`TokenHttpClient`] and maps `oauth2` failures onto client [`Error`] values.

pub use oauth2;

// std
use std::borrow::Cow;
// crates.io
use oauth2::{
	AccessToken, AuthorizationCode, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	ExtraTokenFields, HttpClientError, PkceCodeVerifier, RedirectUrl, RefreshToken,
	RequestTokenError, RevocationUrl, StandardRevocableToken, StandardTokenResponse,
	TokenResponse as _, TokenUrl,
	basic::{
		BasicErrorResponse, BasicErrorResponseType, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenResponse, TokenResponseBuilderError, TokenSecret},
	config::Config,
	error::{ConfigError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};

/// Token response members beyond the OAuth 2.0 core set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OidcTokenFields {
	/// Compact ID token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
	/// Remaining members, kept verbatim.
	#[serde(flatten)]
	pub additional: BTreeMap<String, JsonValue>,
}
impl ExtraTokenFields for OidcTokenFields {}

/// Token endpoint response carrying [`OidcTokenFields`].
pub type OidcTokenResponse = StandardTokenResponse<OidcTokenFields, BasicTokenType>;

type OidcClient<HasRevocationUrl = EndpointNotSet> = Client<
	BasicErrorResponse,
	OidcTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	HasRevocationUrl,
	EndpointSet,
>;
type TokenRequestError<E> = RequestTokenError<HttpClientError<E>, BasicErrorResponse>;
type RevocationRequestError<E> = RequestTokenError<HttpClientError<E>, BasicRevocationErrorResponse>;

/// Maps HTTP transport failures into client [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a client error.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(meta, message),
			_ => map_unknown_transport_error(meta),
		}
	}
}

/// Token endpoint bound to one discovered configuration.
pub(crate) struct TokenEndpoint<'a, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: OidcClient,
	http_client: &'a C,
	error_mapper: &'a M,
}
impl<'a, C, M> TokenEndpoint<'a, C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn new(
		config: &Config,
		token_endpoint: &Url,
		http_client: &'a C,
		error_mapper: &'a M,
	) -> Result<Self> {
		let token_url = TokenUrl::new(token_endpoint.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { source })?;
		let mut oauth_client: OidcClient =
			Client::new(ClientId::new(config.client_id.clone())).set_token_uri(token_url);

		if let Some(secret) = &config.client_secret {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.expose().to_owned()));
		}

		Ok(Self { oauth_client, http_client, error_mapper })
	}

	pub(crate) async fn exchange_authorization_code(
		&self,
		code: &str,
		pkce_verifier: &str,
		redirect_uri: &Url,
	) -> Result<TokenResponse> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let redirect_url = RedirectUrl::new(redirect_uri.to_string())
			.map_err(|source| ConfigError::InvalidRedirect { source })?;
		let response = self
			.oauth_client
			.exchange_code(AuthorizationCode::new(code.to_owned()))
			.set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
			.set_redirect_uri(Cow::Owned(redirect_url))
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper))?;

		map_token_response(response)
	}

	pub(crate) async fn refresh(
		&self,
		refresh_token: &str,
		extra_params: &BTreeMap<String, String>,
	) -> Result<TokenResponse> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let refresh_secret = RefreshToken::new(refresh_token.to_owned());
		let mut request = self.oauth_client.exchange_refresh_token(&refresh_secret);

		for (key, value) in extra_params {
			request = request.add_extra_param(key.as_str(), value.as_str());
		}

		let response = request
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper))?;

		map_token_response(response)
	}

	pub(crate) async fn client_credentials(&self, audience: &str) -> Result<TokenResponse> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.add_extra_param("audience", audience)
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper))?;

		map_token_response(response)
	}

	pub(crate) async fn revoke(&self, endpoint: &Url, token: RevocableSecret<'_>) -> Result<()> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let revocable = match token {
			RevocableSecret::Refresh(secret) =>
				StandardRevocableToken::RefreshToken(RefreshToken::new(secret.expose().to_owned())),
			RevocableSecret::Access(secret) =>
				StandardRevocableToken::AccessToken(AccessToken::new(secret.expose().to_owned())),
		};
		let client: OidcClient<EndpointSet> =
			self.oauth_client.clone().set_revocation_url(RevocationUrl::from_url(endpoint.clone()));

		client
			.revoke_token(revocable)
			.map_err(ConfigError::from)?
			.request_async(&instrumented)
			.await
			.map_err(|err| map_revocation_error(meta.take(), err, self.error_mapper))
	}
}

/// Token chosen for revocation.
#[derive(Clone, Copy, Debug)]
pub(crate) enum RevocableSecret<'a> {
	Refresh(&'a TokenSecret),
	Access(&'a TokenSecret),
}

fn map_token_response(response: OidcTokenResponse) -> Result<TokenResponse> {
	let mut builder = TokenResponse::builder()
		.access_token(response.access_token().secret().to_owned())
		.issued_at(OffsetDateTime::now_utc());

	if let Some(expires_in) = response.expires_in() {
		let secs =
			i64::try_from(expires_in.as_secs()).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

		builder = builder.expires_in(Duration::seconds(secs));
	}
	if let Some(refresh) = response.refresh_token() {
		builder = builder.refresh_token(refresh.secret().to_owned());
	}
	if let Some(id_token) = &response.extra_fields().id_token {
		builder = builder.id_token(id_token.to_owned());
	}
	if let Some(scopes) = response.scopes() {
		builder = builder.scope(
			ScopeSet::new(scopes.iter().map(|scope| scope.as_str())).map_err(ConfigError::from)?,
		);
	}
	for (key, value) in &response.extra_fields().additional {
		builder = builder.additional_parameter(key, value.clone());
	}

	builder.build().map_err(|e| match e {
		TokenResponseBuilderError::ExpiryOutOfRange => Error::from(ConfigError::ExpiresInOutOfRange),
		e => Error::from(ConfigError::from(e)),
	})
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: TokenRequestError<E>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, meta_ref),
		RequestTokenError::Request(error) => mapper.map_transport_error(meta_ref, error),
		RequestTokenError::Parse(error, _body) =>
			TransientError::TokenResponseParse { source: error, status: meta_status(meta_ref) }
				.into(),
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message: format!("Token endpoint returned an unexpected response: {message}"),
			status: meta_status(meta_ref),
			retry_after: meta_retry_after(meta_ref),
		}
		.into(),
	}
}

fn map_server_response_error(response: BasicErrorResponse, meta: Option<&ResponseMetadata>) -> Error {
	let message = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	match response.error() {
		BasicErrorResponseType::InvalidGrant => Error::InvalidGrant { reason: message },
		BasicErrorResponseType::InvalidClient | BasicErrorResponseType::UnauthorizedClient =>
			Error::InvalidClient { reason: message },
		_ => TransientError::TokenEndpoint {
			message,
			status: meta_status(meta),
			retry_after: meta_retry_after(meta),
		}
		.into(),
	}
}

fn map_revocation_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: RevocationRequestError<E>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();
	let reason = match err {
		RequestTokenError::Request(error) => return mapper.map_transport_error(meta_ref, error),
		RequestTokenError::ServerResponse(response) => response.to_string(),
		RequestTokenError::Parse(error, _body) => error.to_string(),
		RequestTokenError::Other(message) => message,
	};

	Error::RevocationFailed { status: meta_status(meta_ref), reason }
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::TokenEndpoint {
			message: "Request timed out while calling the token endpoint".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn map_generic_transport_error(meta: Option<&ResponseMetadata>, message: impl Display) -> Error {
	TransientError::TokenEndpoint {
		message: format!("HTTP client error occurred while calling the token endpoint: {message}"),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

#[cfg(feature = "reqwest")]
fn map_unknown_transport_error(meta: Option<&ResponseMetadata>) -> Error {
	TransientError::TokenEndpoint {
		message: "HTTP client error occurred while calling the token endpoint".into(),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
