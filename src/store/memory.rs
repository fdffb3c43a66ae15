//! In-process [`AuthStateStorage`] for tests and demos.

// self
use crate::{
	_prelude::*,
	auth::AuthState,
	store::{AuthStateStorage, StoreFuture},
};

/// Storage backend keeping the serialized state in memory.
///
/// Clones share the same slot, so a test can keep a handle to inspect what the client
/// persisted.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Arc<RwLock<Option<AuthState>>>);
impl MemoryStorage {
	/// Creates storage pre-populated with `state`.
	pub fn with_state(state: AuthState) -> Self {
		Self(Arc::new(RwLock::new(Some(state))))
	}

	/// Returns a copy of the stored state.
	pub fn snapshot(&self) -> Option<AuthState> {
		self.0.read().clone()
	}
}
impl AuthStateStorage for MemoryStorage {
	fn get(&self) -> StoreFuture<'_, Option<AuthState>> {
		let state = self.snapshot();

		Box::pin(async move { Ok(state) })
	}

	fn set(&self, state: Option<AuthState>) -> StoreFuture<'_, ()> {
		*self.0.write() = state;

		Box::pin(async { Ok(()) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		self.set(None)
	}
}
