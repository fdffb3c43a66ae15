//! Sequential ID token validation gate.
//!
//! [`DefaultIdTokenValidator`] runs the checks in a fixed order and stops at the first failure:
//!
//! 1. the token must be present;
//! 2. it must parse;
//! 3. the key set must contain a key for its `(kid, alg)`;
//! 4. the header `kid` must equal the resolved key's `kid`;
//! 5. `client_id`, `aud`, `nonce`, `iss`, and `exp` must hold;
//! 6. the resolved key must form an RSA public key;
//! 7. `c_hash` must bind the token to the authorization code.
//!
//! Claim checks run before key construction, and the code binding runs last so callers without
//! an authorization code fail deterministically at that step.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	codec,
	config::Config,
	id_token::{
		IdToken, IdTokenPayload, JwksError, KeyResolver, ParseError, PublicKeyReconstructor,
		RsaKeyReconstructor,
	},
};

const CODE_HASH_LEN: usize = 16;

/// Future returned by [`IdTokenValidator`] implementations.
pub type ValidationFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ValidationError>> + 'a + Send>>;

/// Reasons an ID token is rejected.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// No ID token was supplied.
	#[error("ID token is missing.")]
	MissingIdToken,
	/// Token structure could not be decoded.
	#[error(transparent)]
	Parse(#[from] ParseError),
	/// Signing key could not be resolved.
	#[error(transparent)]
	Jwks(#[from] JwksError),
	/// Header `kid` differs from the resolved key.
	#[error("ID token key identifier does not match the resolved key.")]
	KeyIdMismatch,
	/// One of the client, audience, nonce, issuer, or expiry checks failed.
	#[error("ID token claims failed validation.")]
	PayloadValidationFailed,
	/// Resolved key material does not form a public key.
	#[error("Public key could not be constructed from the resolved key.")]
	PublicKeyConstructionFailed,
	/// `c_hash` does not bind the token to the authorization code.
	#[error("ID token is not bound to the authorization code.")]
	AuthCodeBindingFailed,
}

/// Inputs for a single validation pass.
#[derive(Clone, Copy, Debug)]
pub struct ValidationInput<'a> {
	/// Compact ID token, when one was received.
	pub id_token: Option<&'a str>,
	/// Authorization code the token must be bound to.
	pub authorization_code: Option<&'a str>,
	/// Expected client identifier and audience.
	pub client_id: &'a str,
	/// Nonce sent with the authorization request.
	pub nonce: &'a str,
	/// Key set location from discovery.
	pub jwks_url: &'a Url,
	/// Client configuration providing the expected issuer domain.
	pub config: &'a Config,
	/// Instant the expiry is checked against.
	pub now: OffsetDateTime,
}
impl<'a> ValidationInput<'a> {
	/// Creates an input checked against the current clock and without an authorization code.
	pub fn new(
		id_token: Option<&'a str>,
		client_id: &'a str,
		nonce: &'a str,
		jwks_url: &'a Url,
		config: &'a Config,
	) -> Self {
		Self {
			id_token,
			authorization_code: None,
			client_id,
			nonce,
			jwks_url,
			config,
			now: OffsetDateTime::now_utc(),
		}
	}

	/// Sets the authorization code used for the `c_hash` binding.
	pub fn with_authorization_code(mut self, code: &'a str) -> Self {
		self.authorization_code = Some(code);

		self
	}

	/// Overrides the instant used for the expiry check.
	pub fn at(mut self, now: OffsetDateTime) -> Self {
		self.now = now;

		self
	}
}

/// Validates ID tokens received during flow completion.
pub trait IdTokenValidator
where
	Self: Send + Sync,
{
	/// Accepts or rejects the token described by `input`.
	fn validate<'a>(&'a self, input: ValidationInput<'a>) -> ValidationFuture<'a>;
}

/// Validator wiring the parser, a [`KeyResolver`], and a [`PublicKeyReconstructor`].
#[derive(Clone)]
pub struct DefaultIdTokenValidator {
	resolver: Arc<dyn KeyResolver>,
	reconstructor: Arc<dyn PublicKeyReconstructor>,
}
impl DefaultIdTokenValidator {
	/// Creates a validator using the `rsa`-backed reconstructor.
	pub fn new(resolver: Arc<dyn KeyResolver>) -> Self {
		Self { resolver, reconstructor: Arc::new(RsaKeyReconstructor) }
	}

	/// Replaces the public key reconstructor.
	pub fn with_reconstructor(mut self, reconstructor: Arc<dyn PublicKeyReconstructor>) -> Self {
		self.reconstructor = reconstructor;

		self
	}
}
impl IdTokenValidator for DefaultIdTokenValidator {
	fn validate<'a>(&'a self, input: ValidationInput<'a>) -> ValidationFuture<'a> {
		Box::pin(async move {
			let raw = input.id_token.ok_or(ValidationError::MissingIdToken)?;
			let token = IdToken::parse(raw)?;
			let key = self.resolver.resolve(input.jwks_url, token.header()).await?;

			if token.header().key_id != key.key_id {
				return Err(ValidationError::KeyIdMismatch);
			}
			if !claims_hold(token.payload(), &input) {
				return Err(ValidationError::PayloadValidationFailed);
			}

			self.reconstructor
				.reconstruct(&key.modulus, &key.exponent)
				.ok_or(ValidationError::PublicKeyConstructionFailed)?;

			if !code_hash_matches(input.authorization_code.unwrap_or_default(), &token.payload().code_hash)
			{
				return Err(ValidationError::AuthCodeBindingFailed);
			}

			Ok(())
		})
	}
}
impl Debug for DefaultIdTokenValidator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("DefaultIdTokenValidator(..)")
	}
}

/// Computes the `c_hash` value for an authorization code.
///
/// Returns `None` for empty or non-ASCII codes, which can never be bound.
pub fn code_hash(code: &str) -> Option<String> {
	if code.is_empty() || !code.is_ascii() {
		return None;
	}

	let digest = Sha256::digest(code.as_bytes());

	Some(STANDARD.encode(&digest[..CODE_HASH_LEN]))
}

fn claims_hold(payload: &IdTokenPayload, input: &ValidationInput) -> bool {
	payload.client_id == input.client_id
		&& payload.audience == input.client_id
		&& payload.nonce == input.nonce
		&& payload.issuer == input.config.expected_token_issuer()
		&& payload.expires_at > input.now
}

fn code_hash_matches(code: &str, claim: &str) -> bool {
	code_hash(code).is_some_and(|expected| expected == codec::base64url_to_base64(claim))
}
