mod common;

// std
use std::{path::PathBuf, sync::Arc};
// crates.io
use oidc_auth_client::{
	auth::TokenSecret,
	flows::RefreshRequest,
	store::{AuthStateStorage, FileStorage, MemoryStorage},
};
// self
use common::*;

fn scratch_path(name: &str) -> PathBuf {
	std::env::temp_dir()
		.join(format!("oidc-auth-client-it-{}", std::process::id()))
		.join(format!("{name}.json"))
}

async fn client_with_storage(
	transport: &FakeTransport,
	agent: Arc<ScriptedUserAgent>,
	storage: Arc<dyn AuthStateStorage>,
) -> TestClient {
	TestClientBuilder::with_http_client(
		config(),
		agent,
		Arc::new(transport.clone()),
		Arc::new(FakeMapper),
	)
	.storage(storage)
	.build()
	.await
	.expect("Client should build.")
}

#[tokio::test]
async fn completed_flow_survives_a_restart() {
	let path = scratch_path("restart");
	let _ = std::fs::remove_file(&path);
	let transport = FakeTransport::provider();
	let storage = Arc::new(FileStorage::open(&path).expect("File storage should open."));
	let client =
		client_with_storage(&transport, ScriptedUserAgent::code_flow(transport.clone(), "C"), storage)
			.await;

	client.start_flow(&RefreshRequest::default()).await.expect("Code flow should complete.");

	assert!(path.exists(), "Completed flow should be written through.");

	let reopened = Arc::new(FileStorage::open(&path).expect("File storage should reopen."));
	let agent = ScriptedUserAgent::awaiting_resume();
	let restarted = client_with_storage(&transport, agent.clone(), reopened).await;
	let access = restarted
		.get_access_token(&RefreshRequest::default())
		.await
		.expect("Persisted session should be usable after a restart.");

	assert_eq!(access.expose(), "access-1");
	assert!(restarted.check_authenticated(&RefreshRequest::default()).await);

	restarted.logout().await.expect("Logout should succeed.");

	assert!(!path.exists(), "Logout should remove the persisted state.");
	assert_eq!(agent.presented().len(), 1);
}

#[tokio::test]
async fn memory_storage_tracks_the_authoritative_state() {
	let transport = FakeTransport::provider();
	let storage = Arc::new(MemoryStorage::default());
	let client = client_with_storage(
		&transport,
		ScriptedUserAgent::code_flow(transport.clone(), "C"),
		storage.clone(),
	)
	.await;

	assert!(storage.snapshot().is_none());

	client.start_flow(&RefreshRequest::default()).await.expect("Code flow should complete.");

	let persisted = storage.snapshot().expect("Session should be written through.");

	assert_eq!(
		persisted.last_token_response.as_ref().map(|response| response.access_token.expose()),
		Some("access-1")
	);
	assert_eq!(persisted.refresh_token().map(TokenSecret::expose), Some("refresh-1"));

	client.logout().await.expect("Logout should succeed.");

	assert!(storage.snapshot().is_none());
}
