//! Consuming builder that validates client settings into a [`Config`].

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	config::Config,
	error::ConfigError,
};

/// Builder for [`Config`] values.
#[derive(Debug)]
pub struct ConfigBuilder {
	client_id: String,
	client_secret: Option<TokenSecret>,
	domain: String,
	redirect_uri: String,
	post_logout_redirect_uri: Option<String>,
	scopes: Vec<String>,
	login_hint: Option<String>,
	acr_values: BTreeSet<String>,
	ui_locales: BTreeSet<String>,
	prompts: BTreeSet<String>,
	audiences: Vec<String>,
}
impl ConfigBuilder {
	/// Creates a builder seeded with the required settings.
	pub fn new(
		client_id: impl Into<String>,
		domain: impl Into<String>,
		redirect_uri: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: None,
			domain: domain.into(),
			redirect_uri: redirect_uri.into(),
			post_logout_redirect_uri: None,
			scopes: Vec::new(),
			login_hint: None,
			acr_values: BTreeSet::new(),
			ui_locales: BTreeSet::new(),
			prompts: BTreeSet::new(),
			audiences: Vec::new(),
		}
	}

	/// Sets the client secret for confidential clients.
	pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Sets the redirect target used after end-session.
	pub fn post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
		self.post_logout_redirect_uri = Some(uri.into());

		self
	}

	/// Adds scopes requested alongside the defaults.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes.extend(scopes.into_iter().map(Into::into));

		self
	}

	/// Sets the `login_hint` parameter.
	pub fn login_hint(mut self, hint: impl Into<String>) -> Self {
		self.login_hint = Some(hint.into());

		self
	}

	/// Adds `acr_values` entries.
	pub fn acr_values<I, S>(mut self, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.acr_values.extend(values.into_iter().map(Into::into));

		self
	}

	/// Adds `ui_locales` entries.
	pub fn ui_locales<I, S>(mut self, locales: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.ui_locales.extend(locales.into_iter().map(Into::into));

		self
	}

	/// Adds `prompt` values.
	pub fn prompts<I, S>(mut self, prompts: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.prompts.extend(prompts.into_iter().map(Into::into));

		self
	}

	/// Adds requested audiences; blank entries are dropped at build time.
	pub fn audiences<I, S>(mut self, audiences: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.audiences.extend(audiences.into_iter().map(Into::into));

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<Config> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId.into());
		}

		let domain = normalize_domain(&self.domain);
		let issuer = Url::parse(&format!("https://{domain}"))
			.ok()
			.filter(|url| !domain.is_empty() && url.host_str().is_some_and(|host| !host.is_empty()))
			.ok_or_else(|| Error::InvalidDomainUrl { domain: self.domain.clone() })?;
		let redirect_uri = parse_redirect(&self.redirect_uri)?;
		let post_logout_redirect_uri =
			self.post_logout_redirect_uri.as_deref().map(parse_redirect).transpose()?;
		let scopes = ScopeSet::new(self.scopes).map_err(ConfigError::from)?;
		let audiences = self
			.audiences
			.iter()
			.map(|audience| audience.trim())
			.filter(|audience| !audience.is_empty())
			.map(str::to_owned)
			.collect();

		Ok(Config {
			client_id: self.client_id,
			client_secret: self.client_secret,
			domain,
			issuer,
			redirect_uri,
			post_logout_redirect_uri,
			scopes,
			login_hint: self.login_hint,
			acr_values: self.acr_values,
			ui_locales: self.ui_locales,
			prompts: self.prompts,
			audiences,
		})
	}
}

fn normalize_domain(raw: &str) -> String {
	let trimmed = raw.trim();
	let without_scheme = trimmed.strip_prefix("https://").unwrap_or(trimmed);

	without_scheme.trim_end_matches('/').to_owned()
}

fn parse_redirect(raw: &str) -> Result<Url> {
	Url::parse(raw).map_err(|_| Error::InvalidRedirectUri { uri: raw.to_owned() })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn domain_is_normalized_into_issuer() {
		let config = ConfigBuilder::new("client", "https://example.com/", "com.example.app://callback")
			.build()
			.expect("Config should build.");

		assert_eq!(config.domain, "example.com");
		assert_eq!(config.issuer.as_str(), "https://example.com/");
		assert_eq!(config.expected_token_issuer(), "https://example.com/");
		assert_eq!(
			config.discovery_url().expect("Discovery URL should build.").as_str(),
			"https://example.com/.well-known/openid-configuration"
		);
	}

	#[test]
	fn invalid_inputs_are_typed() {
		assert!(matches!(
			ConfigBuilder::new("client", "", "app://cb").build(),
			Err(Error::InvalidDomainUrl { .. })
		));
		assert!(matches!(
			ConfigBuilder::new("client", "exa mple.com", "app://cb").build(),
			Err(Error::InvalidDomainUrl { .. })
		));
		assert!(matches!(
			ConfigBuilder::new("client", "example.com", "not a uri").build(),
			Err(Error::InvalidRedirectUri { .. })
		));
		assert!(matches!(
			ConfigBuilder::new("client", "example.com", "app://cb")
				.post_logout_redirect_uri("::")
				.build(),
			Err(Error::InvalidRedirectUri { .. })
		));
		assert!(matches!(
			ConfigBuilder::new(" ", "example.com", "app://cb").build(),
			Err(Error::Config(ConfigError::MissingClientId))
		));
		assert!(matches!(
			ConfigBuilder::new("client", "example.com", "app://cb").scopes(["bad scope"]).build(),
			Err(Error::Config(ConfigError::InvalidScope(_)))
		));
	}

	#[test]
	fn audiences_are_trimmed_and_blank_entries_dropped() {
		let config = ConfigBuilder::new("client", "example.com", "app://cb")
			.audiences([" api ", "", "   ", "billing"])
			.scopes(["profile"])
			.build()
			.expect("Config should build.");

		assert_eq!(config.audiences.iter().collect::<Vec<_>>(), ["api", "billing"]);
		assert_eq!(config.requested_scopes().normalized(), "offline openid profile");
	}

	#[test]
	fn logout_redirect_falls_back_to_account_page() {
		let config =
			ConfigBuilder::new("client", "example.com", "app://cb").build().expect("Config should build.");

		assert_eq!(
			config.post_logout_redirect_uri_or_default().expect("Fallback should parse.").as_str(),
			"https://example.com/myaccount/#/logged-out"
		);

		let config = ConfigBuilder::new("client", "example.com", "app://cb")
			.post_logout_redirect_uri("app://logged-out")
			.build()
			.expect("Config should build.");

		assert_eq!(
			config.post_logout_redirect_uri_or_default().expect("Configured URI should win.").as_str(),
			"app://logged-out"
		);
	}
}
