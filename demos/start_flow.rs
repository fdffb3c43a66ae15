//! Runs the authorization-code + PKCE flow against a real provider.
//!
//! The authorization URL is printed instead of opened; paste the redirect URL the browser lands
//! on back into the terminal to finish the exchange.
//!
//! ```sh
//! OIDC_DOMAIN=login.example.com OIDC_CLIENT_ID=native-app \
//! 	cargo run --example start_flow
//! ```

// std
use std::{env, io, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::eyre};
use url::Url;
// self
use oidc_auth_client::{
	agent::{ExternalUserAgent, UserAgentFuture, UserAgentOutcome, UserAgentRequest},
	config::Config,
	flows::{AuthClientBuilder, RefreshRequest},
	store::MemoryStorage,
};

/// Prints the request and waits for the redirect to be pasted back.
struct TerminalUserAgent;
impl ExternalUserAgent for TerminalUserAgent {
	fn present<'a>(&'a self, request: &'a UserAgentRequest) -> UserAgentFuture<'a> {
		Box::pin(async move {
			println!("Open {} and paste the final redirect URL below.", request.url);

			Ok(UserAgentOutcome::AwaitingResume)
		})
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let domain = env::var("OIDC_DOMAIN").unwrap_or_else(|_| "login.example.com".into());
	let client_id = env::var("OIDC_CLIENT_ID").unwrap_or_else(|_| "native-app".into());
	let config = Config::builder(client_id, domain, "com.example.app:/callback")
		.scopes(["openid", "profile", "offline_access"])
		.build()?;
	let client = Arc::new(
		AuthClientBuilder::new(config, Arc::new(TerminalUserAgent))
			.storage(Arc::new(MemoryStorage::default()))
			.build()
			.await?,
	);
	let flow = tokio::spawn({
		let client = Arc::clone(&client);

		async move { client.start_flow(&RefreshRequest::default()).await }
	});
	let mut line = String::new();

	io::stdin().read_line(&mut line)?;

	let redirect: Url = line.trim().parse()?;

	if !client.resume_external_user_agent_flow(&redirect) {
		return Err(eyre!("Redirect `{redirect}` does not belong to the pending flow."));
	}

	let authenticated = flow.await??;

	println!("Signed in; flow state is {:?}.", client.flow_state());

	if let Some(claims) = authenticated.claims {
		println!("Subject: {}.", claims.get("sub").cloned().unwrap_or_default());
	}

	let access = client.get_access_token(&RefreshRequest::default()).await?;

	println!("Access token has {} characters.", access.expose().len());

	client.logout().await?;

	Ok(())
}
