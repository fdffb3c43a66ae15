//! Biometric gate consulted while constructing an auth client.

// self
use crate::_prelude::*;

/// Future returned by [`BiometricAuthenticator::authenticate`].
pub type BiometricFuture<'a> = Pin<Box<dyn Future<Output = bool> + 'a + Send>>;

/// Whether client construction requires a biometric check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BiometricPolicy {
	/// No check.
	#[default]
	None,
	/// Any enrolled biometric must succeed.
	Any,
}

/// Device biometric prompt.
pub trait BiometricAuthenticator
where
	Self: Send + Sync,
{
	/// Returns `true` when the device can run a biometric prompt.
	fn is_supported(&self) -> bool;

	/// Prompts the end-user and resolves to `true` on success.
	fn authenticate(&self) -> BiometricFuture<'_>;
}

/// Runs the gate required by `policy`.
pub async fn enforce(
	policy: BiometricPolicy,
	authenticator: Option<&dyn BiometricAuthenticator>,
) -> Result<()> {
	if policy == BiometricPolicy::None {
		return Ok(());
	}

	let authenticator = authenticator.ok_or(Error::BiometricUnavailable)?;

	if !authenticator.is_supported() {
		return Err(Error::BiometricNotSupported);
	}
	if !authenticator.authenticate().await {
		return Err(Error::BiometricAuthenticationFailed);
	}

	Ok(())
}
