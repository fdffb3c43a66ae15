//! JWKS document retrieval and `(kid, alg)` key selection.

// self
use crate::{_prelude::*, error::TransportError, http::ByteFetcher, id_token::IdTokenHeader};

/// Future returned by [`KeyResolver`] implementations.
pub type KeyFuture<'a> = Pin<Box<dyn Future<Output = Result<JwksKeyEntry, JwksError>> + 'a + Send>>;

/// Failures raised while resolving a signing key.
#[derive(Debug, ThisError)]
pub enum JwksError {
	/// Key set document could not be fetched.
	#[error("JWKS document could not be fetched.")]
	Transport(#[from] TransportError),
	/// Key set document is not a JSON object.
	#[error("JWKS document is not a JSON object.")]
	InvalidJson(#[source] serde_json::Error),
	/// Key set document has no `keys` array.
	#[error("JWKS document does not contain a keys array.")]
	MissingKeysArray,
	/// No key matched the token header.
	#[error("No JWKS key matches kid `{key_id}` and alg `{algorithm}`.")]
	KeyNotFound {
		/// Requested key identifier.
		key_id: String,
		/// Requested algorithm.
		algorithm: String,
	},
}

/// Single entry of a key set document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwksKeyEntry {
	/// Algorithm (`alg`).
	pub algorithm: String,
	/// Public exponent (`e`).
	pub exponent: String,
	/// Key identifier (`kid`).
	pub key_id: String,
	/// Key type (`kty`).
	pub key_type: String,
	/// Modulus (`n`).
	pub modulus: String,
	/// Intended usage (`use`).
	pub usage: String,
}
impl JwksKeyEntry {
	fn from_object(entry: &JsonMap<String, JsonValue>) -> Self {
		let field = |key: &str| entry.get(key).and_then(JsonValue::as_str).unwrap_or_default();

		Self {
			algorithm: field("alg").to_owned(),
			exponent: field("e").to_owned(),
			key_id: field("kid").to_owned(),
			key_type: field("kty").to_owned(),
			modulus: field("n").to_owned(),
			usage: field("use").to_owned(),
		}
	}
}

/// Resolves the signing key for a token header.
pub trait KeyResolver
where
	Self: Send + Sync,
{
	/// Returns the first key in the set at `jwks_url` matching the header's `kid` and `alg`.
	fn resolve<'a>(&'a self, jwks_url: &'a Url, header: &'a IdTokenHeader) -> KeyFuture<'a>;
}

/// Resolver that re-fetches the key set through a [`ByteFetcher`] on every call.
#[derive(Clone)]
pub struct HttpKeyResolver {
	fetcher: Arc<dyn ByteFetcher>,
}
impl HttpKeyResolver {
	/// Creates a resolver backed by the provided fetcher.
	pub fn new(fetcher: Arc<dyn ByteFetcher>) -> Self {
		Self { fetcher }
	}
}
impl KeyResolver for HttpKeyResolver {
	fn resolve<'a>(&'a self, jwks_url: &'a Url, header: &'a IdTokenHeader) -> KeyFuture<'a> {
		Box::pin(async move {
			let document = self.fetcher.fetch(jwks_url).await?;

			select_key(&document, header)
		})
	}
}
impl Debug for HttpKeyResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("HttpKeyResolver(..)")
	}
}

/// Scans a key set document for the first entry matching the header.
///
/// Entries that are not JSON objects are skipped; a scan that finds nothing reports
/// [`JwksError::KeyNotFound`] even when such entries were present.
pub fn select_key(document: &[u8], header: &IdTokenHeader) -> Result<JwksKeyEntry, JwksError> {
	let json = serde_json::from_slice::<JsonMap<String, JsonValue>>(document)
		.map_err(JwksError::InvalidJson)?;
	let keys = json.get("keys").and_then(JsonValue::as_array).ok_or(JwksError::MissingKeysArray)?;

	keys.iter()
		.filter_map(JsonValue::as_object)
		.map(JwksKeyEntry::from_object)
		.find(|entry| entry.algorithm == header.algorithm && entry.key_id == header.key_id)
		.ok_or_else(|| JwksError::KeyNotFound {
			key_id: header.key_id.clone(),
			algorithm: header.algorithm.clone(),
		})
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn header(kid: &str, alg: &str) -> IdTokenHeader {
		IdTokenHeader { key_id: kid.into(), algorithm: alg.into() }
	}

	#[test]
	fn first_matching_entry_wins() {
		let document = json!({
			"keys": [
				{"kid": "k1", "alg": "RS512", "n": "wrong-alg"},
				{"kid": "k1", "alg": "RS256", "n": "first", "e": "AQAB", "kty": "RSA", "use": "sig"},
				{"kid": "k1", "alg": "RS256", "n": "second"},
			]
		})
		.to_string();
		let entry =
			select_key(document.as_bytes(), &header("k1", "RS256")).expect("Key should resolve.");

		assert_eq!(entry.modulus, "first");
		assert_eq!(entry.exponent, "AQAB");
		assert_eq!(entry.key_type, "RSA");
		assert_eq!(entry.usage, "sig");
	}

	#[test]
	fn malformed_entries_are_skipped() {
		let document = json!({
			"keys": ["garbage", 17, null, {"kid": "k2", "alg": "RS256", "n": "ok"}]
		})
		.to_string();
		let entry =
			select_key(document.as_bytes(), &header("k2", "RS256")).expect("Key should resolve.");

		assert_eq!(entry.modulus, "ok");

		let err = select_key(document.as_bytes(), &header("k3", "RS256"))
			.expect_err("Unknown kid should not resolve.");

		assert!(matches!(err, JwksError::KeyNotFound { .. }));
	}

	#[test]
	fn document_shape_errors_are_typed() {
		assert!(matches!(
			select_key(b"not json", &header("k", "RS256")),
			Err(JwksError::InvalidJson(_))
		));
		assert!(matches!(
			select_key(b"[]", &header("k", "RS256")),
			Err(JwksError::InvalidJson(_))
		));
		assert!(matches!(
			select_key(br#"{"keys": {}}"#, &header("k", "RS256")),
			Err(JwksError::MissingKeysArray)
		));
	}
}
