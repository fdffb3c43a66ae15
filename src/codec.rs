//! Base64url helpers and JSON decoding for compact token segments.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::_prelude::*;

/// Converts a base64url string into padded standard base64.
pub fn base64url_to_base64(input: &str) -> String {
	let mut out: String = input
		.chars()
		.map(|c| match c {
			'-' => '+',
			'_' => '/',
			other => other,
		})
		.collect();
	let remainder = out.len() % 4;

	if remainder != 0 {
		out.extend(std::iter::repeat_n('=', 4 - remainder));
	}

	out
}

/// Converts standard base64 into unpadded base64url.
pub fn base64_to_base64url(input: &str) -> String {
	input
		.chars()
		.filter(|c| *c != '=')
		.map(|c| match c {
			'+' => '-',
			'/' => '_',
			other => other,
		})
		.collect()
}

/// Decodes a base64url segment (padded or not) into raw bytes.
pub fn decode_base64url(segment: &str) -> Option<Vec<u8>> {
	STANDARD.decode(base64url_to_base64(segment)).ok()
}

/// Decodes a base64url segment holding a UTF-8 JSON object.
pub fn decode_json_object(segment: &str) -> Option<JsonMap<String, JsonValue>> {
	let bytes = decode_base64url(segment)?;

	serde_json::from_slice(&bytes).ok()
}
