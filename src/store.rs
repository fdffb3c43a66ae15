//! Auth state persistence: the storage collaborator contract and the caching store on top.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// self
use crate::{
	_prelude::*,
	auth::{AuthState, AuthorizationResponse, TokenResponse},
	discovery::ServiceConfiguration,
};

/// Fixed account key the serialized auth state is stored under.
pub const AUTH_STATE_ACCOUNT_KEY: &str = "oidc_auth_client.auth_state";

/// Future returned by [`AuthStateStorage`] implementations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage collaborator holding one serialized [`AuthState`] per installation.
pub trait AuthStateStorage
where
	Self: Send + Sync,
{
	/// Loads the persisted state, if any.
	fn get(&self) -> StoreFuture<'_, Option<AuthState>>;

	/// Replaces the persisted state; `None` removes it.
	fn set(&self, state: Option<AuthState>) -> StoreFuture<'_, ()>;

	/// Removes the persisted state.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`AuthStateStorage`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

enum Slot {
	Unloaded,
	Loaded(Option<AuthState>),
}

/// In-memory authoritative copy of the auth state, written through to storage.
///
/// The first read loads from storage and the result is cached for the store's lifetime. Every
/// write replaces the in-memory value before persisting it; persistence failures are logged and
/// never surface to the caller. Readers always observe a whole value, and writers are serialized
/// so storage sees updates in the same order as memory.
pub struct AuthStateStore {
	storage: Arc<dyn AuthStateStorage>,
	current: RwLock<Slot>,
	writer: AsyncMutex<()>,
}
impl AuthStateStore {
	/// Creates a store that lazily loads from `storage`.
	pub fn new(storage: Arc<dyn AuthStateStorage>) -> Self {
		Self { storage, current: RwLock::new(Slot::Unloaded), writer: AsyncMutex::new(()) }
	}

	/// Returns the current state, loading it from storage on first access.
	pub async fn get(&self) -> Option<AuthState> {
		if let Some(state) = self.snapshot() {
			return state;
		}

		let _writer = self.writer.lock().await;

		self.current_locked().await
	}

	/// Replaces the current state.
	pub async fn set(&self, state: AuthState) {
		let _writer = self.writer.lock().await;

		self.commit_locked(Some(state)).await;
	}

	/// Stores a completed authorization, replacing any previous state.
	pub async fn set_authorization(
		&self,
		configuration: ServiceConfiguration,
		authorization: AuthorizationResponse,
		token_response: Option<TokenResponse>,
	) -> AuthState {
		let state = AuthState::authorized(configuration, authorization, token_response);

		self.set(state.clone()).await;

		state
	}

	/// Applies the outcome of a refresh attempt to the current state.
	///
	/// Does nothing and returns `None` when no state exists.
	pub async fn update_from_refresh(
		&self,
		token_response: Option<TokenResponse>,
		authorization_error: Option<String>,
	) -> Option<AuthState> {
		let _writer = self.writer.lock().await;
		let mut state = self.current_locked().await?;

		if let Some(response) = token_response {
			state.apply_refresh(response);
		}
		if authorization_error.is_some() {
			state.authorization_error = authorization_error;
		}

		self.commit_locked(Some(state.clone())).await;

		Some(state)
	}

	/// Clears the state from memory and storage.
	pub async fn reset(&self) {
		let _writer = self.writer.lock().await;

		self.commit_locked(None).await;
	}

	fn snapshot(&self) -> Option<Option<AuthState>> {
		match &*self.current.read() {
			Slot::Loaded(state) => Some(state.clone()),
			Slot::Unloaded => None,
		}
	}

	async fn current_locked(&self) -> Option<AuthState> {
		if let Some(state) = self.snapshot() {
			return state;
		}

		let loaded = match self.storage.get().await {
			Ok(state) => state,
			Err(e) => {
				flow_event!(warn, error = %e, "Persisted auth state could not be loaded.");

				let _ = e;

				None
			},
		};

		*self.current.write() = Slot::Loaded(loaded.clone());

		loaded
	}

	async fn commit_locked(&self, state: Option<AuthState>) {
		let clearing = state.is_none();

		*self.current.write() = Slot::Loaded(state.clone());

		let persisted =
			if clearing { self.storage.clear().await } else { self.storage.set(state).await };

		if let Err(e) = persisted {
			flow_event!(warn, error = %e, clearing, "Auth state could not be persisted.");

			let _ = e;
		}
	}
}
impl Debug for AuthStateStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let loaded = matches!(&*self.current.read(), Slot::Loaded(_));

		f.debug_struct("AuthStateStore").field("loaded", &loaded).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[derive(Default)]
	struct FailingStorage {
		loads: AtomicUsize,
		writes: AtomicUsize,
	}
	impl AuthStateStorage for FailingStorage {
		fn get(&self) -> StoreFuture<'_, Option<AuthState>> {
			self.loads.fetch_add(1, Ordering::SeqCst);

			Box::pin(async { Err(StoreError::Backend { message: "locked".into() }) })
		}

		fn set(&self, _: Option<AuthState>) -> StoreFuture<'_, ()> {
			self.writes.fetch_add(1, Ordering::SeqCst);

			Box::pin(async { Err(StoreError::Backend { message: "read-only".into() }) })
		}

		fn clear(&self) -> StoreFuture<'_, ()> {
			self.writes.fetch_add(1, Ordering::SeqCst);

			Box::pin(async { Err(StoreError::Backend { message: "read-only".into() }) })
		}
	}

	fn configuration() -> ServiceConfiguration {
		let url = |path: &str| {
			Url::parse(&format!("https://example.com{path}")).expect("Fixture URL should parse.")
		};

		ServiceConfiguration {
			issuer: url("/"),
			authorization_endpoint: url("/authorize"),
			token_endpoint: url("/token"),
			jwks_uri: url("/jwks"),
			end_session_endpoint: None,
			revocation_endpoint: None,
		}
	}

	#[tokio::test]
	async fn storage_failures_do_not_fail_callers() {
		let storage = Arc::new(FailingStorage::default());
		let store = AuthStateStore::new(storage.clone());

		assert!(store.get().await.is_none());
		assert!(store.get().await.is_none());
		assert_eq!(storage.loads.load(Ordering::SeqCst), 1, "Load result must be cached.");

		store.set(AuthState::new(configuration())).await;

		assert!(store.get().await.is_some(), "Memory stays authoritative after a failed write.");

		store.reset().await;

		assert!(store.get().await.is_none());
		assert_eq!(storage.writes.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn refresh_update_requires_existing_state() {
		let store = AuthStateStore::new(Arc::new(MemoryStorage::default()));
		let response = TokenResponse::builder()
			.access_token("a")
			.build()
			.expect("Token response should build.");

		assert!(store.update_from_refresh(Some(response.clone()), None).await.is_none());

		store.set(AuthState::new(configuration())).await;

		let updated = store
			.update_from_refresh(Some(response), Some("invalid_grant".into()))
			.await
			.expect("Existing state should be updated.");

		assert!(updated.last_token_response.is_some());
		assert_eq!(updated.authorization_error.as_deref(), Some("invalid_grant"));
		assert!(!updated.is_authorized());
	}
}
