//! OpenID Connect client for native apps: PKCE and hybrid authorization flows, persisted auth
//! state, transparent refresh, and JWKS-backed ID token validation.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod agent;
pub mod auth;
pub mod biometric;
pub mod codec;
pub mod config;
pub mod discovery;
pub mod error;
pub mod flows;
pub mod http;
pub mod id_token;
pub mod oauth;
pub mod obs;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map as JsonMap, Value as JsonValue};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub(crate) use crate::obs::flow_event;
	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
