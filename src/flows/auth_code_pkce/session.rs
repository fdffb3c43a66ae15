// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{AuthorizationResponse, ScopeSet, TokenSecret},
	config::Config,
	discovery::ServiceConfiguration,
	flows::common::{self, RedirectParameters},
};

const STATE_LEN: usize = 32;
const NONCE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods surfaced via [`AuthorizationSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// `response_type` requested from the authorization endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
	/// Authorization code flow.
	Code,
	/// Hybrid flow returning a front-channel ID token alongside the code.
	CodeIdToken,
}
impl ResponseType {
	/// Returns the wire value.
	pub fn as_str(self) -> &'static str {
		match self {
			ResponseType::Code => "code",
			ResponseType::CodeIdToken => "code id_token",
		}
	}
}

/// Authorization request metadata built for one flow attempt.
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Requested response type.
	pub response_type: ResponseType,
	/// Requested scope set, defaults included.
	pub scope: ScopeSet,
	/// Opaque state value that must round-trip via the redirect.
	pub state: String,
	/// Nonce the returned ID token must carry.
	pub nonce: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Fully-formed authorize URL presented to the end-user.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl AuthorizationSession {
	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn code_challenge_method(&self) -> PkceCodeChallengeMethod {
		self.pkce.method
	}

	pub(crate) fn code_verifier(&self) -> &str {
		&self.pkce.verifier
	}

	/// Validates a redirect against this request and extracts the authorization response.
	pub(crate) fn complete(&self, redirect: &Url) -> Result<AuthorizationResponse> {
		let params = RedirectParameters::from_url(redirect);

		if let Some(error) = params.get("error") {
			return Err(Error::AuthorizationRejected {
				error: error.to_owned(),
				description: params.get("error_description").map(str::to_owned),
			});
		}
		if params.get("state") != Some(self.state.as_str()) {
			return Err(Error::StateMismatch);
		}

		let code = params.get("code").ok_or(Error::TokenExchangeRequestMissing)?;

		Ok(AuthorizationResponse {
			code: TokenSecret::new(code),
			state: self.state.clone(),
			nonce: self.nonce.clone(),
			redirect_uri: self.redirect_uri.clone(),
			code_verifier: TokenSecret::new(self.pkce.verifier.clone()),
			id_token: params.get("id_token").map(TokenSecret::new),
			scope: self.scope.clone(),
		})
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("response_type", &self.response_type)
			.field("scope", &self.scope)
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.pkce.challenge)
			.field("code_challenge_method", &self.pkce.method)
			.finish()
	}
}

#[derive(Clone)]
struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = common::random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

pub(crate) fn build_session(
	config: &Config,
	configuration: &ServiceConfiguration,
	response_type: ResponseType,
) -> AuthorizationSession {
	let scope = config.requested_scopes();
	let state = common::random_string(STATE_LEN);
	let nonce = common::random_string(NONCE_LEN);
	let pkce = PkcePair::generate();
	let authorize_url = build_authorize_url(
		config,
		&configuration.authorization_endpoint,
		response_type,
		&scope,
		&state,
		&nonce,
		&pkce,
	);

	AuthorizationSession {
		response_type,
		scope,
		state,
		nonce,
		redirect_uri: config.redirect_uri.clone(),
		authorize_url,
		pkce,
	}
}

fn build_authorize_url(
	config: &Config,
	endpoint: &Url,
	response_type: ResponseType,
	scope: &ScopeSet,
	state: &str,
	nonce: &str,
	pkce: &PkcePair,
) -> Url {
	let mut url = endpoint.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", response_type.as_str());
	pairs.append_pair("client_id", &config.client_id);
	pairs.append_pair("redirect_uri", config.redirect_uri.as_str());
	pairs.append_pair("scope", &scope.normalized());
	pairs.append_pair("state", state);
	pairs.append_pair("nonce", nonce);
	pairs.append_pair("code_challenge", &pkce.challenge);
	pairs.append_pair("code_challenge_method", pkce.method.as_str());

	if let Some(login_hint) = &config.login_hint {
		pairs.append_pair("login_hint", login_hint);
	}

	for (name, values) in [
		("acr_values", &config.acr_values),
		("ui_locales", &config.ui_locales),
		("prompt", &config.prompts),
		("audience", &config.audiences),
	] {
		if let Some(joined) = space_joined(values) {
			pairs.append_pair(name, &joined);
		}
	}

	drop(pairs);

	url
}

fn space_joined(values: &BTreeSet<String>) -> Option<String> {
	let joined = values
		.iter()
		.map(|value| value.trim())
		.filter(|value| !value.is_empty())
		.collect::<Vec<_>>()
		.join(" ");

	(!joined.is_empty()).then_some(joined)
}

fn compute_pkce_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
