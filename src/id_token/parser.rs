//! Compact ID token parsing into typed header and payload views.
//!
//! Parsing is strict about structure (three segments, base64url JSON objects) and permissive
//! about content: missing or wrongly typed claims fall back to empty strings or the Unix epoch
//! so that validation, not parsing, decides whether a claim is acceptable.

// self
use crate::{_prelude::*, codec};

/// Structural failures raised while splitting and decoding a compact token.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ParseError {
	/// Token does not have exactly three dot-separated segments.
	#[error("ID token does not have a header, payload, and signature segment.")]
	MalformedToken,
	/// Header segment is not a base64url-encoded JSON object.
	#[error("ID token header cannot be decoded.")]
	HeaderDecodeError,
	/// Payload segment is not a base64url-encoded JSON object.
	#[error("ID token payload cannot be decoded.")]
	PayloadDecodeError,
}

/// JOSE header fields used for key selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdTokenHeader {
	/// Key identifier (`kid`).
	pub key_id: String,
	/// Signing algorithm (`alg`).
	pub algorithm: String,
}

/// Typed view over the ID token claims.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdTokenPayload {
	/// Session identifier (`sid`).
	pub session_id: String,
	/// Authentication instant (`auth_time`).
	pub auth_time: OffsetDateTime,
	/// Expiry instant (`exp`).
	pub expires_at: OffsetDateTime,
	/// Request instant (`rat`).
	pub requested_at: OffsetDateTime,
	/// Issue instant (`iat`).
	pub issued_at: OffsetDateTime,
	/// Client identifier (`client_id`).
	pub client_id: String,
	/// Provider user identifier (`user_id`).
	pub user_id: String,
	/// Subject (`sub`).
	pub subject: String,
	/// Authorization code hash (`c_hash`).
	pub code_hash: String,
	/// First audience entry (`aud`).
	pub audience: String,
	/// Issuer (`iss`).
	pub issuer: String,
	/// Token identifier (`jti`).
	pub jwt_id: String,
	/// Request nonce (`nonce`).
	pub nonce: String,
}
impl IdTokenPayload {
	fn from_claims(claims: &JsonMap<String, JsonValue>) -> Self {
		Self {
			session_id: string_claim(claims, "sid"),
			auth_time: time_claim(claims, "auth_time"),
			expires_at: time_claim(claims, "exp"),
			requested_at: time_claim(claims, "rat"),
			issued_at: time_claim(claims, "iat"),
			client_id: string_claim(claims, "client_id"),
			user_id: string_claim(claims, "user_id"),
			subject: string_claim(claims, "sub"),
			code_hash: string_claim(claims, "c_hash"),
			audience: audience_claim(claims),
			issuer: string_claim(claims, "iss"),
			jwt_id: string_claim(claims, "jti"),
			nonce: string_claim(claims, "nonce"),
		}
	}
}

/// Parsed compact ID token.
#[derive(Clone, PartialEq, Eq)]
pub struct IdToken {
	header: IdTokenHeader,
	payload: IdTokenPayload,
	signature: String,
	claims: JsonMap<String, JsonValue>,
}
impl IdToken {
	/// Splits and decodes a compact token.
	pub fn parse(raw: &str) -> Result<Self, ParseError> {
		let segments = raw.split('.').collect::<Vec<_>>();
		let [header, payload, signature] = segments.as_slice() else {
			return Err(ParseError::MalformedToken);
		};
		let header = codec::decode_json_object(header).ok_or(ParseError::HeaderDecodeError)?;
		let claims = codec::decode_json_object(payload).ok_or(ParseError::PayloadDecodeError)?;

		Ok(Self {
			header: IdTokenHeader {
				key_id: string_claim(&header, "kid"),
				algorithm: string_claim(&header, "alg"),
			},
			payload: IdTokenPayload::from_claims(&claims),
			signature: (*signature).to_owned(),
			claims,
		})
	}

	/// Header fields used for key selection.
	pub fn header(&self) -> &IdTokenHeader {
		&self.header
	}

	/// Typed claim view.
	pub fn payload(&self) -> &IdTokenPayload {
		&self.payload
	}

	/// Raw signature segment.
	pub fn signature(&self) -> &str {
		&self.signature
	}

	/// Every decoded claim, including ones without a typed field.
	pub fn claims(&self) -> &JsonMap<String, JsonValue> {
		&self.claims
	}

	/// Consumes the token and returns the decoded claims.
	pub fn into_claims(self) -> JsonMap<String, JsonValue> {
		self.claims
	}
}
impl Debug for IdToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdToken")
			.field("header", &self.header)
			.field("payload", &self.payload)
			.field("signature", &"<redacted>")
			.finish()
	}
}

fn string_claim(claims: &JsonMap<String, JsonValue>, key: &str) -> String {
	claims.get(key).and_then(JsonValue::as_str).unwrap_or_default().to_owned()
}

fn time_claim(claims: &JsonMap<String, JsonValue>, key: &str) -> OffsetDateTime {
	claims
		.get(key)
		.and_then(|value| value.as_i64().or_else(|| value.as_f64().map(|secs| secs as i64)))
		.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
		.unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

fn audience_claim(claims: &JsonMap<String, JsonValue>) -> String {
	match claims.get("aud") {
		Some(JsonValue::Array(values)) =>
			values.first().and_then(JsonValue::as_str).unwrap_or_default().to_owned(),
		Some(JsonValue::String(value)) => value.clone(),
		_ => String::new(),
	}
}
