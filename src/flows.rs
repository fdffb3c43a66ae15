//! High-level flow orchestrators powered by the token endpoint facade.

pub mod auth_code_pkce;
pub mod common;

mod client_credentials;
mod refresh;
mod session_end;

pub use auth_code_pkce::*;
pub use common::RefreshRequest;
pub use session_end::*;

// std
use std::sync::atomic::AtomicU64;
// self
use crate::{
	_prelude::*,
	agent::ExternalUserAgent,
	auth::{AuthState, TokenSecret},
	biometric::{self, BiometricAuthenticator, BiometricPolicy},
	config::Config,
	discovery::{self, ServiceConfiguration},
	http::{ByteFetcher, TokenHttpClient},
	id_token::{DefaultIdTokenValidator, HttpKeyResolver, IdTokenValidator},
	oauth::{TokenEndpoint, TransportErrorMapper},
	store::{AuthStateStorage, AuthStateStore, MemoryStorage},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport stack.
pub type ReqwestAuthClient = AuthClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Observable position of the client in its flow state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlowState {
	/// No flow has run yet.
	#[default]
	Idle,
	/// Fetching the discovery document.
	Discovering,
	/// Authorization request presented; waiting for the redirect.
	AwaitingRedirect,
	/// Exchanging the authorization code.
	ExchangingToken,
	/// Last flow produced an authenticated session.
	Authenticated,
	/// Last flow failed.
	Failed,
}

/// Successful flow result.
#[derive(Clone, Debug, PartialEq)]
pub struct Authenticated {
	/// Current access token.
	pub access_token: Option<TokenSecret>,
	/// Claims of the latest ID token.
	pub claims: Option<JsonMap<String, JsonValue>>,
}

/// Coordinates OpenID Connect flows for a single client configuration.
///
/// The client owns the HTTP transport, the auth state store, the ID token validator, and the
/// external user agent, so individual flows only carry grant-specific logic. Discovery, token,
/// and revocation requests pass through one barrier and never overlap; presenting the user agent
/// happens outside it so a newer flow can supersede a pending one.
pub struct AuthClient<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	config: Config,
	user_agent: Arc<dyn ExternalUserAgent>,
	validator: Arc<dyn IdTokenValidator>,
	state_store: AuthStateStore,
	pending_flow: Mutex<Option<PendingAuthorizationFlow>>,
	next_flow_id: AtomicU64,
	configuration: RwLock<Option<ServiceConfiguration>>,
	flow_state: RwLock<FlowState>,
	barrier: AsyncMutex<()>,
}
impl<C, M> AuthClient<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Client configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Current flow state.
	pub fn flow_state(&self) -> FlowState {
		*self.flow_state.read()
	}

	/// Provider metadata from the most recent discovery, if any.
	pub fn service_configuration(&self) -> Option<ServiceConfiguration> {
		self.configuration.read().clone()
	}

	/// Current auth state, loaded from storage on first access.
	pub async fn auth_state(&self) -> Option<AuthState> {
		self.state_store.get().await
	}

	fn set_flow_state(&self, state: FlowState) {
		*self.flow_state.write() = state;
	}

	fn token_endpoint<'a>(&'a self, token_endpoint: &Url) -> Result<TokenEndpoint<'a, C, M>> {
		TokenEndpoint::new(
			&self.config,
			token_endpoint,
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
		)
	}

	/// Discovers provider metadata and drops any state bound to a different issuer.
	async fn discover_configuration(&self) -> Result<ServiceConfiguration> {
		let discovery_url = self.config.discovery_url()?;
		let configuration = {
			let _barrier = self.barrier.lock().await;

			discovery::discover(self.http_client.as_ref(), &discovery_url).await?
		};

		if let Some(state) = self.state_store.get().await
			&& !state.configuration.same_issuer(&configuration)
		{
			flow_event!(
				info,
				stored = %state.issuer(),
				discovered = %configuration.issuer,
				"Issuer changed; resetting stored auth state."
			);

			self.state_store.reset().await;
		}

		*self.configuration.write() = Some(configuration.clone());

		Ok(configuration)
	}

	/// Returns the cached configuration, discovering it when none is cached.
	async fn configuration_or_discover(&self) -> Result<ServiceConfiguration> {
		match self.service_configuration() {
			Some(configuration) => Ok(configuration),
			None => self.discover_configuration().await,
		}
	}
}
impl<C, M> Debug for AuthClient<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("client_id", &self.config.client_id)
			.field("domain", &self.config.domain)
			.field("flow_state", &self.flow_state())
			.field("state_store", &self.state_store)
			.finish_non_exhaustive()
	}
}

/// Assembles an [`AuthClient`] from its collaborators.
pub struct AuthClientBuilder<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Config,
	user_agent: Arc<dyn ExternalUserAgent>,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	storage: Option<Arc<dyn AuthStateStorage>>,
	validator: Option<Arc<dyn IdTokenValidator>>,
	biometric_policy: BiometricPolicy,
	biometric: Option<Arc<dyn BiometricAuthenticator>>,
	initial_state: Option<AuthState>,
}
impl<C, M> AuthClientBuilder<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a builder that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: Config,
		user_agent: Arc<dyn ExternalUserAgent>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			config,
			user_agent,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			storage: None,
			validator: None,
			biometric_policy: BiometricPolicy::None,
			biometric: None,
			initial_state: None,
		}
	}

	/// Persists the auth state through `storage` (in-memory by default).
	pub fn storage(mut self, storage: Arc<dyn AuthStateStorage>) -> Self {
		self.storage = Some(storage);

		self
	}

	/// Replaces the default JWKS-backed ID token validator.
	pub fn validator(mut self, validator: Arc<dyn IdTokenValidator>) -> Self {
		self.validator = Some(validator);

		self
	}

	/// Sets the biometric policy without replacing the authenticator.
	pub fn biometric_policy(mut self, policy: BiometricPolicy) -> Self {
		self.biometric_policy = policy;

		self
	}

	/// Requires a biometric check before the client is handed out.
	pub fn biometric(
		mut self,
		policy: BiometricPolicy,
		authenticator: Arc<dyn BiometricAuthenticator>,
	) -> Self {
		self.biometric_policy = policy;
		self.biometric = Some(authenticator);

		self
	}

	/// Seeds the store with an existing auth state, replacing whatever storage holds.
	pub fn initial_state(mut self, state: AuthState) -> Self {
		self.initial_state = Some(state);

		self
	}

	/// Runs the biometric gate and builds the client.
	pub async fn build(self) -> Result<AuthClient<C, M>> {
		biometric::enforce(self.biometric_policy, self.biometric.as_deref()).await?;

		let storage = self.storage.unwrap_or_else(|| Arc::new(MemoryStorage::default()));
		let state_store = AuthStateStore::new(storage);

		if let Some(state) = self.initial_state {
			state_store.set(state).await;
		}

		let validator = match self.validator {
			Some(validator) => validator,
			None => {
				let fetcher: Arc<dyn ByteFetcher> = self.http_client.clone();

				Arc::new(DefaultIdTokenValidator::new(Arc::new(HttpKeyResolver::new(fetcher))))
			},
		};

		Ok(AuthClient {
			http_client: self.http_client,
			transport_mapper: self.transport_mapper,
			config: self.config,
			user_agent: self.user_agent,
			validator,
			state_store,
			pending_flow: Mutex::new(None),
			next_flow_id: AtomicU64::new(0),
			configuration: RwLock::new(None),
			flow_state: RwLock::new(FlowState::Idle),
			barrier: AsyncMutex::new(()),
		})
	}
}
#[cfg(feature = "reqwest")]
impl AuthClientBuilder<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a builder that provisions its own reqwest-backed transport.
	pub fn new(config: Config, user_agent: Arc<dyn ExternalUserAgent>) -> Self {
		Self::with_http_client(
			config,
			user_agent,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for AuthClientBuilder<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClientBuilder")
			.field("config", &self.config)
			.field("biometric_policy", &self.biometric_policy)
			.field("initial_state_set", &self.initial_state.is_some())
			.finish_non_exhaustive()
	}
}
