//! File-backed [`AuthStateStorage`] holding one JSON blob under a fixed account key.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::AuthState,
	store::{AUTH_STATE_ACCOUNT_KEY, AuthStateStorage, StoreError, StoreFuture},
};

#[derive(Serialize, Deserialize)]
struct StoredBlob {
	account: String,
	state: AuthState,
}

/// Persists the auth state to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStorage {
	path: PathBuf,
}
impl FileStorage {
	/// Opens storage at `path`, creating the parent directory when needed.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		Ok(Self { path })
	}

	/// Location of the JSON blob.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load(&self) -> Result<Option<AuthState>, StoreError> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(backend(format!("Failed to read {}: {e}", self.path.display()))),
		};

		if bytes.is_empty() {
			return Ok(None);
		}

		let blob = serde_json::from_slice::<StoredBlob>(&bytes).map_err(|e| {
			StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", self.path.display()),
			}
		})?;

		if blob.account != AUTH_STATE_ACCOUNT_KEY {
			return Ok(None);
		}

		Ok(Some(blob.state))
	}

	fn persist(&self, state: AuthState) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let blob = StoredBlob { account: AUTH_STATE_ACCOUNT_KEY.to_owned(), state };
		let serialized = serde_json::to_vec_pretty(&blob).map_err(|e| {
			StoreError::Serialization { message: format!("Failed to serialize auth state: {e}") }
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path)
				.map_err(|e| backend(format!("Failed to create {}: {e}", tmp_path.display())))?;

			file.write_all(&serialized)
				.map_err(|e| backend(format!("Failed to write {}: {e}", tmp_path.display())))?;
			file.sync_all()
				.map_err(|e| backend(format!("Failed to sync {}: {e}", tmp_path.display())))?;
		}

		fs::rename(&tmp_path, &self.path)
			.map_err(|e| backend(format!("Failed to replace {}: {e}", self.path.display())))
	}

	fn remove(&self) -> Result<(), StoreError> {
		match fs::remove_file(&self.path) {
			Err(e) if e.kind() != ErrorKind::NotFound =>
				Err(backend(format!("Failed to remove {}: {e}", self.path.display()))),
			_ => Ok(()),
		}
	}
}
impl AuthStateStorage for FileStorage {
	fn get(&self) -> StoreFuture<'_, Option<AuthState>> {
		Box::pin(async move { self.load() })
	}

	fn set(&self, state: Option<AuthState>) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			match state {
				Some(state) => self.persist(state),
				None => self.remove(),
			}
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move { self.remove() })
	}
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| {
			backend(format!("Failed to create storage directory {}: {e}", parent.display()))
		})?;
	}

	Ok(())
}

fn backend(message: String) -> StoreError {
	StoreError::Backend { message }
}
