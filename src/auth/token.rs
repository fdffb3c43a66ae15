//! Token secrets and token endpoint responses.

pub mod response;
pub mod secret;
