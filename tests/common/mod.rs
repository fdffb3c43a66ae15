#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	future::Future,
	io,
	pin::Pin,
	sync::Arc,
};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use oidc_auth_client::{
	agent::{
		ExternalUserAgent, UserAgentError, UserAgentFuture, UserAgentOutcome, UserAgentRequest,
	},
	auth::{AuthState, AuthorizationResponse, ScopeSet, TokenResponse, TokenSecret},
	codec,
	config::Config,
	discovery::ServiceConfiguration,
	error::{Error, TransportError},
	flows::{AuthClient, AuthClientBuilder},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	id_token::code_hash,
	oauth::{
		TransportErrorMapper,
		oauth2::{
			AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
			http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
		},
	},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use url::Url;

pub const DOMAIN: &str = "example.com";
pub const ISSUER: &str = "https://example.com/";
pub const CLIENT_ID: &str = "client-it";
pub const REDIRECT_URI: &str = "com.example.app:/callback";
pub const KEY_ID: &str = "k1";
pub const MODULUS: &str = "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw";
pub const EXPONENT: &str = "AQAB";

pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
pub const TOKEN_PATH: &str = "/token";
pub const JWKS_PATH: &str = "/jwks";
pub const REVOKE_PATH: &str = "/revoke";
pub const LOGOUT_PATH: &str = "/logout";

pub type TestClient = AuthClient<FakeTransport, FakeMapper>;
pub type TestClientBuilder = AuthClientBuilder<FakeTransport, FakeMapper>;

/// Request observed by [`FakeTransport`].
#[derive(Clone, Debug)]
pub struct RecordedRequest {
	pub method: String,
	pub path: String,
	pub body: String,
}
impl RecordedRequest {
	pub fn form(&self) -> HashMap<String, String> {
		url::form_urlencoded::parse(self.body.as_bytes()).into_owned().collect()
	}
}

#[derive(Default)]
struct FakeState {
	routes: Mutex<HashMap<String, VecDeque<(u16, String)>>>,
	requests: Mutex<Vec<RecordedRequest>>,
}

/// In-process transport answering by request path, regardless of scheme and host.
///
/// Responses queued for a path are served in order; the last one keeps answering. Unrouted
/// paths fail with an I/O error.
#[derive(Clone, Default)]
pub struct FakeTransport(Arc<FakeState>);
impl FakeTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Transport serving the discovery document and the key set of the example provider.
	pub fn provider() -> Self {
		let transport = Self::new();

		transport.respond(DISCOVERY_PATH, 200, discovery_document(ISSUER, true).to_string());
		transport.respond(JWKS_PATH, 200, jwks_document().to_string());

		transport
	}

	/// Replaces every queued response for `path`.
	pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) {
		self.0.routes.lock().insert(path.to_owned(), VecDeque::from([(status, body.into())]));
	}

	/// Queues a response served after the ones already queued for `path`.
	pub fn enqueue(&self, path: &str, status: u16, body: impl Into<String>) {
		self.0.routes.lock().entry(path.to_owned()).or_default().push_back((status, body.into()));
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.0.requests.lock().clone()
	}

	pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
		self.requests().into_iter().filter(|request| request.path == path).collect()
	}

	fn answer(&self, request: &HttpRequest) -> Option<(u16, String)> {
		let path = request.uri().path().to_owned();

		self.0.requests.lock().push(RecordedRequest {
			method: request.method().as_str().to_owned(),
			path: path.clone(),
			body: String::from_utf8_lossy(request.body()).into_owned(),
		});

		let mut routes = self.0.routes.lock();
		let queue = routes.get_mut(&path)?;

		if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
	}
}
impl TokenHttpClient for FakeTransport {
	type Handle = FakeHandle;
	type TransportError = io::Error;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHandle { transport: self.clone(), slot }
	}
}

#[derive(Clone)]
pub struct FakeHandle {
	transport: FakeTransport,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for FakeHandle {
	type Error = HttpClientError<io::Error>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let (status, body) = self.transport.answer(&request).ok_or_else(|| {
				HttpClientError::Io(io::Error::new(
					io::ErrorKind::ConnectionRefused,
					format!("No route for {}.", request.uri()),
				))
			})?;

			self.slot.store(ResponseMetadata { status: Some(status), retry_after: None });

			let mut response = HttpResponse::new(body.into_bytes());

			*response.status_mut() =
				StatusCode::from_u16(status).map_err(|e| HttpClientError::Other(e.to_string()))?;
			response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

			Ok(response)
		})
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FakeMapper;
impl TransportErrorMapper<io::Error> for FakeMapper {
	fn map_transport_error(
		&self,
		_metadata: Option<&ResponseMetadata>,
		error: HttpClientError<io::Error>,
	) -> Error {
		TransportError::network(error).into()
	}
}

type Script = Box<dyn Fn(&UserAgentRequest) -> Result<UserAgentOutcome, UserAgentError> + Send + Sync>;

/// User agent answering every presentation through a script and recording the requests.
pub struct ScriptedUserAgent {
	script: Script,
	presented: Mutex<Vec<UserAgentRequest>>,
}
impl ScriptedUserAgent {
	pub fn new<F>(script: F) -> Arc<Self>
	where
		F: 'static + Fn(&UserAgentRequest) -> Result<UserAgentOutcome, UserAgentError> + Send + Sync,
	{
		Arc::new(Self { script: Box::new(script), presented: Mutex::new(Vec::new()) })
	}

	/// Agent that leaves the redirect to `resume_external_user_agent_flow`.
	pub fn awaiting_resume() -> Arc<Self> {
		Self::new(|_| Ok(UserAgentOutcome::AwaitingResume))
	}

	pub fn failing(error: UserAgentError) -> Arc<Self> {
		Self::new(move |_| Err(error.clone()))
	}

	/// Agent completing the code flow: it primes the token endpoint with an ID token bound to the
	/// request's nonce and `code`, then returns the redirect.
	pub fn code_flow(transport: FakeTransport, code: &'static str) -> Arc<Self> {
		Self::new(move |request| {
			let nonce = query_param(&request.url, "nonce").unwrap_or_default();
			let state = query_param(&request.url, "state").unwrap_or_default();

			transport.respond(
				TOKEN_PATH,
				200,
				token_body("access-1", Some("refresh-1"), Some(&id_token(&valid_claims(&nonce, code))), 3600),
			);

			Ok(UserAgentOutcome::Redirected(redirect(&request.redirect_uri, &[("code", code), ("state", &state)], false)))
		})
	}

	pub fn presented(&self) -> Vec<UserAgentRequest> {
		self.presented.lock().clone()
	}
}
impl ExternalUserAgent for ScriptedUserAgent {
	fn present<'a>(&'a self, request: &'a UserAgentRequest) -> UserAgentFuture<'a> {
		self.presented.lock().push(request.clone());

		let outcome = (self.script)(request);

		Box::pin(async move { outcome })
	}
}

pub fn config() -> Config {
	Config::builder(CLIENT_ID, DOMAIN, REDIRECT_URI).build().expect("Test config should build.")
}

pub async fn build_client(transport: &FakeTransport, agent: Arc<ScriptedUserAgent>) -> TestClient {
	TestClientBuilder::with_http_client(config(), agent, Arc::new(transport.clone()), Arc::new(FakeMapper))
		.build()
		.await
		.expect("Client should build.")
}

pub async fn build_client_with_state(
	transport: &FakeTransport,
	agent: Arc<ScriptedUserAgent>,
	state: AuthState,
) -> TestClient {
	TestClientBuilder::with_http_client(config(), agent, Arc::new(transport.clone()), Arc::new(FakeMapper))
		.initial_state(state)
		.build()
		.await
		.expect("Client should build.")
}

pub fn discovery_document(issuer: &str, with_optional_endpoints: bool) -> Value {
	let base = issuer.trim_end_matches('/');
	let mut document = json!({
		"issuer": issuer,
		"authorization_endpoint": format!("{base}/authorize"),
		"token_endpoint": format!("{base}{TOKEN_PATH}"),
		"jwks_uri": format!("{base}{JWKS_PATH}"),
	});

	if with_optional_endpoints {
		document["revocation_endpoint"] = json!(format!("{base}{REVOKE_PATH}"));
		document["end_session_endpoint"] = json!(format!("{base}{LOGOUT_PATH}"));
	}

	document
}

pub fn service_configuration(issuer: &str, with_optional_endpoints: bool) -> ServiceConfiguration {
	serde_json::from_value(discovery_document(issuer, with_optional_endpoints))
		.expect("Discovery fixture should deserialize.")
}

pub fn jwks_document() -> Value {
	json!({
		"keys": [
			"not-an-object",
			{"kid": KEY_ID, "alg": "RS512", "kty": "RSA", "n": "other", "e": EXPONENT},
			{"kid": KEY_ID, "alg": "RS256", "kty": "RSA", "use": "sig", "n": MODULUS, "e": EXPONENT},
		]
	})
}

/// Claims accepted by the default validator for `nonce` and `code`.
pub fn valid_claims(nonce: &str, code: &str) -> Value {
	let now = OffsetDateTime::now_utc().unix_timestamp();

	json!({
		"iss": ISSUER,
		"sub": "user-1",
		"aud": [CLIENT_ID],
		"client_id": CLIENT_ID,
		"nonce": nonce,
		"iat": now,
		"exp": now + 60,
		"c_hash": code_hash(code).map(|hash| codec::base64_to_base64url(&hash)).unwrap_or_default(),
	})
}

pub fn id_token(claims: &Value) -> String {
	id_token_with_header(&json!({"alg": "RS256", "kid": KEY_ID, "typ": "JWT"}), claims)
}

pub fn id_token_with_header(header: &Value, claims: &Value) -> String {
	format!(
		"{}.{}.{}",
		URL_SAFE_NO_PAD.encode(header.to_string()),
		URL_SAFE_NO_PAD.encode(claims.to_string()),
		URL_SAFE_NO_PAD.encode("signature"),
	)
}

pub fn token_body(
	access_token: &str,
	refresh_token: Option<&str>,
	id_token: Option<&str>,
	expires_in: i64,
) -> String {
	let mut body = json!({
		"access_token": access_token,
		"token_type": "Bearer",
		"expires_in": expires_in,
	});

	if let Some(refresh_token) = refresh_token {
		body["refresh_token"] = json!(refresh_token);
	}
	if let Some(id_token) = id_token {
		body["id_token"] = json!(id_token);
	}

	body.to_string()
}

pub fn token_response(
	access_token: &str,
	refresh_token: Option<&str>,
	id_token: Option<&str>,
	expires_in: Duration,
) -> TokenResponse {
	let mut builder = TokenResponse::builder().access_token(access_token).expires_in(expires_in);

	if let Some(refresh_token) = refresh_token {
		builder = builder.refresh_token(refresh_token);
	}
	if let Some(id_token) = id_token {
		builder = builder.id_token(id_token);
	}

	builder.build().expect("Token response fixture should build.")
}

/// Authorized state bound to `issuer` holding `token`.
pub fn authorized_state(issuer: &str, token: TokenResponse) -> AuthState {
	let authorization = AuthorizationResponse {
		code: TokenSecret::new("code-0"),
		state: "state-0".into(),
		nonce: "nonce-0".into(),
		redirect_uri: Url::parse(REDIRECT_URI).expect("Redirect fixture should parse."),
		code_verifier: TokenSecret::new("verifier-0"),
		id_token: None,
		scope: ScopeSet::default(),
	};

	AuthState::authorized(service_configuration(issuer, true), authorization, Some(token))
}

pub fn query_param(url: &Url, key: &str) -> Option<String> {
	url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
}

/// Builds a redirect to `base` carrying `params` in the query or the fragment.
pub fn redirect(base: &Url, params: &[(&str, &str)], fragment: bool) -> Url {
	let encoded = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(params).finish();
	let mut url = base.clone();

	if fragment {
		url.set_fragment(Some(&encoded));
	} else {
		url.set_query(Some(&encoded));
	}

	url
}

/// Polls until the agent has presented `count` requests.
pub async fn wait_for_presentations(agent: &ScriptedUserAgent, count: usize) -> Vec<UserAgentRequest> {
	loop {
		let presented = agent.presented();

		if presented.len() >= count {
			return presented;
		}

		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
	}
}
