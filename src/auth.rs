//! Auth-domain records: scopes, token responses, and the persisted auth state.

pub mod scope;
pub mod state;
pub mod token;

pub use scope::*;
pub use state::*;
pub use token::{response::*, secret::*};
