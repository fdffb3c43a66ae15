//! ID token parsing, key resolution, public key reconstruction, and validation.

pub mod jwks;
pub mod parser;
pub mod public_key;
pub mod validator;

pub use jwks::*;
pub use parser::*;
pub use public_key::*;
pub use validator::*;
