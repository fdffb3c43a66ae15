//! External user agent abstraction (system browser, web authentication session).

// self
use crate::_prelude::*;

/// Future returned by [`ExternalUserAgent::present`].
pub type UserAgentFuture<'a> =
	Pin<Box<dyn Future<Output = Result<UserAgentOutcome, UserAgentError>> + 'a + Send>>;

/// Purpose of a presented request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserAgentRequestKind {
	/// Authorization request for the code or hybrid flow.
	Authorization,
	/// RP-initiated end-session request.
	EndSession,
}

/// Request presented to the end-user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAgentRequest {
	/// Fully built provider URL.
	pub url: Url,
	/// Redirect URI the provider will return to.
	pub redirect_uri: Url,
	/// Purpose of the request.
	pub kind: UserAgentRequestKind,
}

/// How a presented request completed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAgentOutcome {
	/// The agent captured the redirect itself.
	Redirected(Url),
	/// The redirect will be delivered later through
	/// [`AuthClient::resume_external_user_agent_flow`](crate::flows::AuthClient::resume_external_user_agent_flow).
	AwaitingResume,
}

/// Presentation failures.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum UserAgentError {
	/// End-user dismissed the agent.
	#[error("User agent was canceled by the user.")]
	Canceled,
	/// Agent could not be started.
	#[error("User agent is unavailable: {reason}.")]
	Unavailable {
		/// Agent-supplied reason.
		reason: String,
	},
}

/// Presents provider URLs to the end-user.
pub trait ExternalUserAgent
where
	Self: Send + Sync,
{
	/// Opens `request` and completes once the redirect is captured or delegated.
	fn present<'a>(&'a self, request: &'a UserAgentRequest) -> UserAgentFuture<'a>;
}
