//! OpenID provider metadata discovery.

// self
use crate::{_prelude::*, error::BoxError, http::ByteFetcher};

/// Provider metadata fetched from the discovery document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfiguration {
	/// Issuer identifier.
	pub issuer: Url,
	/// Authorization endpoint.
	pub authorization_endpoint: Url,
	/// Token endpoint.
	pub token_endpoint: Url,
	/// Key set document location.
	pub jwks_uri: Url,
	/// End-session endpoint, when the provider supports RP-initiated logout.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub end_session_endpoint: Option<Url>,
	/// Token revocation endpoint, when the provider supports it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub revocation_endpoint: Option<Url>,
}
impl ServiceConfiguration {
	/// Parses a discovery document, reporting the failing field path on error.
	pub fn from_document(document: &[u8]) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut deserializer = serde_json::Deserializer::from_slice(document);

		serde_path_to_error::deserialize(&mut deserializer)
	}

	/// Returns `true` when both configurations name the same issuer.
	///
	/// A trailing slash is not significant.
	pub fn same_issuer(&self, other: &Self) -> bool {
		self.issuer.as_str().trim_end_matches('/') == other.issuer.as_str().trim_end_matches('/')
	}
}

/// Fetches and parses the discovery document at `discovery_url`.
pub async fn discover<F>(fetcher: &F, discovery_url: &Url) -> Result<ServiceConfiguration>
where
	F: ?Sized + ByteFetcher,
{
	let failed = |source: BoxError| Error::DiscoveryFailed {
		issuer: discovery_url.origin().ascii_serialization(),
		source,
	};
	let document = fetcher.fetch(discovery_url).await.map_err(|e| failed(Box::new(e)))?;

	ServiceConfiguration::from_document(&document).map_err(|e| failed(Box::new(e)))
}
