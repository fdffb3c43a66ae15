//! Authorization Code + PKCE orchestration, including the hybrid (`code id_token`) variant.
//!
//! [`AuthClient::start_flow`] discovers the provider, drops state bound to another issuer,
//! reuses a still-valid session when one exists, and otherwise presents the authorization request
//! through the [`ExternalUserAgent`](crate::agent::ExternalUserAgent). The redirect either comes
//! back from the agent directly or through [`AuthClient::resume_external_user_agent_flow`]. Only
//! one request is pending at a time: starting another flow supersedes it.

mod session;

pub use session::*;

// std
use std::sync::atomic::Ordering;
// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	agent::{UserAgentError, UserAgentOutcome, UserAgentRequest, UserAgentRequestKind},
	auth::{AuthorizationResponse, TokenResponse, TokenSecret},
	discovery::ServiceConfiguration,
	flows::{
		AuthClient, Authenticated, FlowState, RefreshRequest,
		common::{self, RedirectParameters},
	},
	http::TokenHttpClient,
	id_token::ValidationInput,
	oauth::TransportErrorMapper,
	obs::{FlowKind, FlowSpan},
};

/// Authorization request waiting for its redirect.
pub(crate) struct PendingAuthorizationFlow {
	id: u64,
	redirect_uri: Url,
	state: String,
	continuation: oneshot::Sender<Url>,
}
impl PendingAuthorizationFlow {
	fn accepts(&self, url: &Url) -> bool {
		common::same_endpoint(&self.redirect_uri, url)
			&& RedirectParameters::from_url(url).get("state") == Some(self.state.as_str())
	}
}

impl<C, M> AuthClient<C, M>
where
	C: TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Runs the Authorization Code + PKCE flow.
	///
	/// Returns the stored session without opening the user agent when its access token is still
	/// valid or can be refreshed.
	pub async fn start_flow(&self, request: &RefreshRequest) -> Result<Authenticated> {
		FlowSpan::new(FlowKind::AuthorizationCode, "start_flow")
			.observe(self.authorize(ResponseType::Code, request))
			.await
	}

	/// Runs the hybrid flow; the front-channel ID token is validated against the returned code
	/// before the code is exchanged.
	pub async fn start_hybrid_flow(&self, request: &RefreshRequest) -> Result<Authenticated> {
		FlowSpan::new(FlowKind::Hybrid, "start_hybrid_flow")
			.observe(self.authorize(ResponseType::CodeIdToken, request))
			.await
	}

	/// Delivers a redirect captured outside the user agent to the pending flow.
	///
	/// Returns `true` when a pending flow accepted `url` (same redirect endpoint, same `state`);
	/// the flow is consumed, so a second delivery returns `false`.
	pub fn resume_external_user_agent_flow(&self, url: &Url) -> bool {
		let pending = {
			let mut slot = self.pending_flow.lock();

			if slot.as_ref().is_some_and(|flow| flow.accepts(url)) { slot.take() } else { None }
		};
		let Some(flow) = pending else {
			return false;
		};

		if flow.continuation.send(url.clone()).is_err() {
			flow_event!(debug, "Pending flow finished before its redirect was delivered.");
		}

		true
	}

	async fn authorize(
		&self,
		response_type: ResponseType,
		request: &RefreshRequest,
	) -> Result<Authenticated> {
		self.set_flow_state(FlowState::Discovering);

		let result = self.run_authorization(response_type, request).await;

		match &result {
			Ok(_) => self.set_flow_state(FlowState::Authenticated),
			// The superseding flow owns the state machine now.
			Err(Error::AuthorizationSuperseded) => (),
			Err(_) => self.set_flow_state(FlowState::Failed),
		}

		result
	}

	async fn run_authorization(
		&self,
		response_type: ResponseType,
		request: &RefreshRequest,
	) -> Result<Authenticated> {
		let configuration = self.discover_configuration().await?;
		let session = build_session(&self.config, &configuration, response_type);

		if let Ok(current) = self.refresh_if_needed(request).await {
			flow_event!(debug, "Stored session is valid; skipping the authorization request.");

			let claims = self.state_store.get().await.and_then(|state| state.claims());

			return Ok(Authenticated { access_token: Some(current.access_token), claims });
		}

		let redirect = self.present_authorization(&session).await?;

		self.set_flow_state(FlowState::ExchangingToken);

		let authorization = session.complete(&redirect)?;
		let token_response = self.exchange(&configuration, &session, &authorization).await?;
		let state =
			self.state_store.set_authorization(configuration, authorization, Some(token_response)).await;

		Ok(Authenticated {
			access_token: state.last_token_response.as_ref().map(|response| response.access_token.clone()),
			claims: state.claims(),
		})
	}

	async fn present_authorization(&self, session: &AuthorizationSession) -> Result<Url> {
		let (flow_id, mut continuation) = self.install_pending_flow(session);

		self.set_flow_state(FlowState::AwaitingRedirect);

		let request = UserAgentRequest {
			url: session.authorize_url.clone(),
			redirect_uri: session.redirect_uri.clone(),
			kind: UserAgentRequestKind::Authorization,
		};

		match self.user_agent.present(&request).await {
			Ok(UserAgentOutcome::Redirected(url)) => {
				if self.take_pending_flow(flow_id) {
					return Ok(url);
				}

				// Resumed concurrently, or replaced by a newer request.
				match continuation.try_recv() {
					Ok(Some(url)) => Ok(url),
					_ => Err(Error::AuthorizationSuperseded),
				}
			},
			Ok(UserAgentOutcome::AwaitingResume) =>
				continuation.await.map_err(|_| Error::AuthorizationSuperseded),
			Err(e) => {
				self.take_pending_flow(flow_id);

				Err(match e {
					UserAgentError::Canceled => Error::UserCanceled,
					UserAgentError::Unavailable { reason } => Error::UserAgentCreationFailed { reason },
				})
			},
		}
	}

	fn install_pending_flow(&self, session: &AuthorizationSession) -> (u64, oneshot::Receiver<Url>) {
		let (sender, receiver) = oneshot::channel();
		let id = self.next_flow_id.fetch_add(1, Ordering::Relaxed);
		let superseded = self.pending_flow.lock().replace(PendingAuthorizationFlow {
			id,
			redirect_uri: session.redirect_uri.clone(),
			state: session.state.clone(),
			continuation: sender,
		});

		if superseded.is_some() {
			flow_event!(info, "Pending authorization request superseded by a newer flow.");
		}

		(id, receiver)
	}

	fn take_pending_flow(&self, flow_id: u64) -> bool {
		let mut slot = self.pending_flow.lock();

		if slot.as_ref().is_some_and(|flow| flow.id == flow_id) {
			slot.take();

			true
		} else {
			false
		}
	}

	async fn exchange(
		&self,
		configuration: &ServiceConfiguration,
		session: &AuthorizationSession,
		authorization: &AuthorizationResponse,
	) -> Result<TokenResponse> {
		if session.response_type == ResponseType::CodeIdToken {
			self.validate_id_token(configuration, authorization.id_token.as_ref(), authorization)
				.await?;
		}

		let token_response = {
			let _barrier = self.barrier.lock().await;

			self.token_endpoint(&configuration.token_endpoint)?
				.exchange_authorization_code(
					authorization.code.expose(),
					authorization.code_verifier.expose(),
					&authorization.redirect_uri,
				)
				.await?
		};

		if session.response_type == ResponseType::Code {
			self.validate_id_token(configuration, token_response.id_token.as_ref(), authorization)
				.await?;
		}

		Ok(token_response)
	}

	async fn validate_id_token(
		&self,
		configuration: &ServiceConfiguration,
		id_token: Option<&TokenSecret>,
		authorization: &AuthorizationResponse,
	) -> Result<()> {
		let input = ValidationInput::new(
			id_token.map(TokenSecret::expose),
			&self.config.client_id,
			&authorization.nonce,
			&configuration.jwks_uri,
			&self.config,
		)
		.with_authorization_code(authorization.code.expose());

		self.validator.validate(input).await.map_err(|e| {
			flow_event!(warn, error = %e, "ID token rejected.");

			Error::from(e)
		})
	}
}
