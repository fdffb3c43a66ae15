mod common;

// std
use std::sync::Arc;
// crates.io
use oidc_auth_client::{
	config::Config,
	id_token::{
		DefaultIdTokenValidator, HttpKeyResolver, IdTokenHeader, IdTokenValidator, JwksError,
		JwksKeyEntry, KeyFuture, KeyResolver, ParseError, ValidationError, ValidationInput,
	},
};
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use url::Url;
// self
use common::*;

const NONCE: &str = "N";
const CODE: &str = "C";

/// Resolver returning one fixed entry whatever the header asks for.
struct FixedResolver(JwksKeyEntry);
impl KeyResolver for FixedResolver {
	fn resolve<'a>(&'a self, _jwks_url: &'a Url, _header: &'a IdTokenHeader) -> KeyFuture<'a> {
		let entry = self.0.clone();

		Box::pin(async move { Ok(entry) })
	}
}

fn entry(key_id: &str, modulus: &str) -> JwksKeyEntry {
	JwksKeyEntry {
		algorithm: "RS256".into(),
		exponent: EXPONENT.into(),
		key_id: key_id.into(),
		key_type: "RSA".into(),
		modulus: modulus.into(),
		usage: "sig".into(),
	}
}

fn http_validator() -> DefaultIdTokenValidator {
	DefaultIdTokenValidator::new(Arc::new(HttpKeyResolver::new(Arc::new(FakeTransport::provider()))))
}

fn jwks_url() -> Url {
	Url::parse("https://example.com/jwks").expect("JWKS URL fixture should parse.")
}

async fn validate(
	validator: &dyn IdTokenValidator,
	token: Option<&str>,
	code: &str,
) -> Result<(), ValidationError> {
	let config = config();
	let jwks_url = jwks_url();

	validator
		.validate(ValidationInput::new(token, CLIENT_ID, NONCE, &jwks_url, &config).with_authorization_code(code))
		.await
}

async fn validate_claims(claims: Value) -> Result<(), ValidationError> {
	validate(&http_validator(), Some(&id_token(&claims)), CODE).await
}

fn mutated(key: &str, value: Value) -> Value {
	let mut claims = valid_claims(NONCE, CODE);

	claims[key] = value;

	claims
}

#[tokio::test]
async fn well_formed_token_passes_every_check() {
	validate_claims(valid_claims(NONCE, CODE)).await.expect("Valid token should pass.");

	// A single-valued `aud` is accepted as well.
	validate_claims(mutated("aud", json!(CLIENT_ID))).await.expect("String audience should pass.");
}

#[tokio::test]
async fn structural_failures_stop_before_key_resolution() {
	let validator = http_validator();

	assert!(matches!(validate(&validator, None, CODE).await, Err(ValidationError::MissingIdToken)));
	assert!(matches!(
		validate(&validator, Some("only.two"), CODE).await,
		Err(ValidationError::Parse(ParseError::MalformedToken))
	));
	assert!(matches!(
		validate(&validator, Some("!!.e30.sig"), CODE).await,
		Err(ValidationError::Parse(ParseError::HeaderDecodeError))
	));
}

#[tokio::test]
async fn unknown_key_is_reported() {
	let token = id_token_with_header(
		&json!({"alg": "RS256", "kid": "rotated"}),
		&valid_claims(NONCE, CODE),
	);
	let err = validate(&http_validator(), Some(&token), CODE).await.expect_err("Unknown kid must fail.");

	assert!(matches!(err, ValidationError::Jwks(JwksError::KeyNotFound { ref key_id, .. }) if key_id == "rotated"));
}

#[tokio::test]
async fn resolved_key_must_carry_the_header_kid() {
	let validator = DefaultIdTokenValidator::new(Arc::new(FixedResolver(entry("k2", MODULUS))));
	let err = validate(&validator, Some(&id_token(&valid_claims(NONCE, CODE))), CODE)
		.await
		.expect_err("Mismatched kid must fail.");

	assert!(matches!(err, ValidationError::KeyIdMismatch));
}

#[tokio::test]
async fn each_claim_mutation_fails_payload_validation() {
	let expired = OffsetDateTime::now_utc() - Duration::seconds(1);

	for claims in [
		mutated("aud", json!(["someone-else"])),
		mutated("client_id", json!("someone-else")),
		mutated("nonce", json!("replayed")),
		mutated("iss", json!("https://example.com")),
		mutated("iss", json!("https://evil.example.com/")),
		mutated("exp", json!(expired.unix_timestamp())),
	] {
		assert!(
			matches!(validate_claims(claims.clone()).await, Err(ValidationError::PayloadValidationFailed)),
			"Claims should be rejected: {claims}."
		);
	}
}

#[tokio::test]
async fn claim_checks_run_before_key_construction() {
	let validator = DefaultIdTokenValidator::new(Arc::new(FixedResolver(entry(KEY_ID, ""))));

	assert!(matches!(
		validate(&validator, Some(&id_token(&mutated("nonce", json!("other")))), CODE).await,
		Err(ValidationError::PayloadValidationFailed)
	));
	assert!(matches!(
		validate(&validator, Some(&id_token(&valid_claims(NONCE, CODE))), CODE).await,
		Err(ValidationError::PublicKeyConstructionFailed)
	));
}

#[tokio::test]
async fn code_binding_is_the_last_check() {
	let validator = http_validator();
	let token = id_token(&valid_claims(NONCE, CODE));

	assert!(matches!(
		validate(&validator, Some(&token), "other-code").await,
		Err(ValidationError::AuthCodeBindingFailed)
	));
	assert!(matches!(
		validate(&validator, Some(&token), "").await,
		Err(ValidationError::AuthCodeBindingFailed)
	));

	let config = Config::builder(CLIENT_ID, DOMAIN, REDIRECT_URI).build().expect("Config should build.");
	let jwks_url = jwks_url();
	let without_code = ValidationInput::new(Some(&token), CLIENT_ID, NONCE, &jwks_url, &config);

	assert!(matches!(
		validator.validate(without_code).await,
		Err(ValidationError::AuthCodeBindingFailed)
	));
}

#[tokio::test]
async fn expiry_is_checked_against_the_supplied_instant() {
	let validator = http_validator();
	let config = config();
	let jwks_url = jwks_url();
	let token = id_token(&valid_claims(NONCE, CODE));
	let later = OffsetDateTime::now_utc() + Duration::minutes(5);
	let input = ValidationInput::new(Some(&token), CLIENT_ID, NONCE, &jwks_url, &config)
		.with_authorization_code(CODE)
		.at(later);

	assert!(matches!(validator.validate(input).await, Err(ValidationError::PayloadValidationFailed)));
}
