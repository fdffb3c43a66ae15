//! Ending a session: token revocation and RP-initiated logout.
//!
//! Both operations treat a missing session as already ended and return `Ok` without contacting
//! the provider. Revocation keeps the local state when the provider does not confirm it; logout
//! always clears the local state once the end-session request has been presented.

// self
use crate::{
	_prelude::*,
	agent::{UserAgentError, UserAgentRequest, UserAgentRequestKind},
	flows::{AuthClient, FlowState, common},
	http::TokenHttpClient,
	oauth::{RevocableSecret, TransportErrorMapper},
	obs::{FlowKind, FlowSpan},
};

const END_SESSION_STATE_LEN: usize = 32;

/// Result of [`AuthClient::revoke`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationOutcome {
	/// The provider confirmed the revocation and the local state was cleared.
	Revoked,
	/// Nothing was sent to the provider.
	NotAttempted(RevocationSkipReason),
}

/// Why [`AuthClient::revoke`] did not contact the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevocationSkipReason {
	/// No auth state exists.
	NoSession,
	/// The provider does not advertise a revocation endpoint.
	NoRevocationEndpoint,
	/// The auth state holds neither a refresh nor an access token.
	NoToken,
}

impl<C, M> AuthClient<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Revokes the session's refresh token (or its access token when no refresh token exists).
	///
	/// The local state is cleared only after the provider confirms the revocation.
	pub async fn revoke(&self) -> Result<RevocationOutcome> {
		FlowSpan::new(FlowKind::Revocation, "revoke").observe(self.revoke_session()).await
	}

	/// Ends the session at the provider and clears the local state.
	///
	/// A state without an ID token cannot build an end-session request: it is cleared and
	/// [`Error::StateMissing`] is returned. Without an end-session endpoint only the local state
	/// is cleared.
	pub async fn logout(&self) -> Result<()> {
		FlowSpan::new(FlowKind::EndSession, "logout")
			.observe(async {
				let result = self.end_session().await;

				self.state_store.reset().await;
				self.set_flow_state(FlowState::Idle);

				result
			})
			.await
	}

	async fn end_session(&self) -> Result<()> {
		let Some(state) = self.state_store.get().await else {
			return Ok(());
		};
		let id_token = state.id_token().ok_or(Error::StateMissing)?;
		let Some(endpoint) = state.configuration.end_session_endpoint.as_ref() else {
			flow_event!(debug, "Provider has no end-session endpoint; clearing local state only.");

			return Ok(());
		};
		let post_logout_redirect_uri = self.config.post_logout_redirect_uri_or_default()?;
		let mut url = endpoint.clone();

		url.query_pairs_mut()
			.append_pair("id_token_hint", id_token.expose())
			.append_pair("post_logout_redirect_uri", post_logout_redirect_uri.as_str())
			.append_pair("state", &common::random_string(END_SESSION_STATE_LEN));

		let request = UserAgentRequest {
			url,
			redirect_uri: post_logout_redirect_uri,
			kind: UserAgentRequestKind::EndSession,
		};

		match self.user_agent.present(&request).await {
			Ok(_) => Ok(()),
			Err(UserAgentError::Canceled) => Err(Error::UserCanceled),
			Err(UserAgentError::Unavailable { reason }) => Err(Error::UserAgentCreationFailed { reason }),
		}
	}

	async fn revoke_session(&self) -> Result<RevocationOutcome> {
		{
			let _barrier = self.barrier.lock().await;
			let Some(state) = self.state_store.get().await else {
				return Ok(RevocationOutcome::NotAttempted(RevocationSkipReason::NoSession));
			};
			let Some(endpoint) = state.configuration.revocation_endpoint.as_ref() else {
				return Ok(RevocationOutcome::NotAttempted(RevocationSkipReason::NoRevocationEndpoint));
			};
			let token_response = state.last_token_response.as_ref();
			let secret = match (
				token_response.and_then(|response| response.refresh_token.as_ref()),
				token_response.map(|response| &response.access_token),
			) {
				(Some(refresh), _) => RevocableSecret::Refresh(refresh),
				(None, Some(access)) => RevocableSecret::Access(access),
				(None, None) => return Ok(RevocationOutcome::NotAttempted(RevocationSkipReason::NoToken)),
			};

			self.token_endpoint(&state.configuration.token_endpoint)?.revoke(endpoint, secret).await?;
		}

		self.state_store.reset().await;
		self.set_flow_state(FlowState::Idle);

		Ok(RevocationOutcome::Revoked)
	}
}
