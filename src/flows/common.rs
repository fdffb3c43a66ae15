//! Shared helpers for flow implementations (refresh requests, random values, redirect parsing).

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, auth::TokenResponse};

/// Parameters for operations that reuse the stored token response before contacting the
/// provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshRequest {
	/// Extra parameters merged into the refresh request body.
	pub parameters: BTreeMap<String, String>,
	/// Forces a refresh even when the stored access token is still valid.
	pub force: bool,
	/// Window before expiry in which the access token is already refreshed.
	pub preemptive_window: Duration,
}
impl RefreshRequest {
	const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

	/// Creates a request with no extra parameters and the default 60 second window.
	pub fn new() -> Self {
		Self {
			parameters: BTreeMap::new(),
			force: false,
			preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW,
		}
	}

	/// Forces the client to bypass the stored token response.
	pub fn force_refresh(mut self) -> Self {
		self.force = true;

		self
	}

	/// Overrides the force flag.
	pub fn with_force(mut self, force: bool) -> Self {
		self.force = force;

		self
	}

	/// Overrides the preemptive window (defaults to 60 seconds).
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Adds a parameter to the refresh request body.
	pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.parameters.insert(key.into(), value.into());

		self
	}

	/// Determines whether the stored token response should be refreshed.
	pub fn should_refresh(&self, response: &TokenResponse, now: OffsetDateTime) -> bool {
		self.force || response.expires_within(now, self.preemptive_window)
	}
}
impl Default for RefreshRequest {
	fn default() -> Self {
		Self::new()
	}
}

/// Parameters carried by an authorization redirect, from its query and fragment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RedirectParameters(BTreeMap<String, String>);
impl RedirectParameters {
	/// Collects query parameters first; fragment parameters override duplicates.
	pub(crate) fn from_url(url: &Url) -> Self {
		let mut params =
			url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect::<BTreeMap<_, _>>();

		if let Some(fragment) = url.fragment() {
			params.extend(
				url::form_urlencoded::parse(fragment.as_bytes())
					.map(|(k, v)| (k.into_owned(), v.into_owned())),
			);
		}

		Self(params)
	}

	pub(crate) fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str).filter(|value| !value.is_empty())
	}
}

/// Returns `true` when `candidate` targets the same endpoint as `redirect_uri`.
///
/// Query and fragment are ignored; they carry the response parameters.
pub(crate) fn same_endpoint(redirect_uri: &Url, candidate: &Url) -> bool {
	redirect_uri.scheme() == candidate.scheme()
		&& redirect_uri.host_str() == candidate.host_str()
		&& redirect_uri.port_or_known_default() == candidate.port_or_known_default()
		&& redirect_uri.path().trim_end_matches('/') == candidate.path().trim_end_matches('/')
}

pub(crate) fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
