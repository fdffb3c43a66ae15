//! Immutable client configuration.
//!
//! A [`Config`] is assembled once through [`ConfigBuilder`] and shared by every flow the client
//! runs; nothing mutates it afterwards.

pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
};

/// Client settings used to build every downstream request.
#[derive(Clone, Debug)]
pub struct Config {
	/// OAuth client identifier.
	pub client_id: String,
	/// Client secret for confidential clients.
	pub client_secret: Option<TokenSecret>,
	/// Provider domain without scheme or trailing slash (e.g. `example.com`).
	pub domain: String,
	/// Issuer URL, `https://{domain}`.
	pub issuer: Url,
	/// Redirect URI registered for the client.
	pub redirect_uri: Url,
	/// Redirect target after end-session, when configured.
	pub post_logout_redirect_uri: Option<Url>,
	/// Scopes requested in addition to the defaults.
	pub scopes: ScopeSet,
	/// `login_hint` parameter.
	pub login_hint: Option<String>,
	/// Requested authentication context classes.
	pub acr_values: BTreeSet<String>,
	/// Preferred UI locales.
	pub ui_locales: BTreeSet<String>,
	/// `prompt` values.
	pub prompts: BTreeSet<String>,
	/// Requested audiences.
	pub audiences: BTreeSet<String>,
}
impl Config {
	/// Returns a builder for the required client settings.
	pub fn builder(
		client_id: impl Into<String>,
		domain: impl Into<String>,
		redirect_uri: impl Into<String>,
	) -> ConfigBuilder {
		ConfigBuilder::new(client_id, domain, redirect_uri)
	}

	/// OpenID discovery document location for the issuer.
	pub fn discovery_url(&self) -> Result<Url> {
		Url::parse(&format!("https://{}/.well-known/openid-configuration", self.domain))
			.map_err(|_| Error::InvalidDomainUrl { domain: self.domain.clone() })
	}

	/// Exact `iss` value ID tokens must carry.
	pub fn expected_token_issuer(&self) -> String {
		format!("https://{}/", self.domain)
	}

	/// Requested scopes merged with the defaults.
	pub fn requested_scopes(&self) -> ScopeSet {
		ScopeSet::with_defaults(&self.scopes)
	}

	/// Post-logout redirect target, falling back to the provider's account page.
	pub fn post_logout_redirect_uri_or_default(&self) -> Result<Url> {
		match &self.post_logout_redirect_uri {
			Some(uri) => Ok(uri.clone()),
			None => Url::parse(&format!(
				"{}/myaccount/#/logged-out",
				self.issuer.as_str().trim_end_matches('/')
			))
			.map_err(|_| Error::InvalidDomainUrl { domain: self.domain.clone() }),
		}
	}
}
