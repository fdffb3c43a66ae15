//! RSA public key reconstruction from raw modulus and exponent strings.
//!
//! The modulus and exponent are taken byte-for-byte as they appear in the key set, wrapped in a
//! DER `SEQUENCE { INTEGER, INTEGER }`, and parsed as PKCS#1. The parsed integers become the key
//! as-is; the only limit is eight bits per modulus byte.

// crates.io
use rsa::{
	BigUint, RsaPublicKey,
	pkcs1::{self, der::Decode},
};
// self
use crate::_prelude::*;

const DER_INTEGER: u8 = 0x02;
const DER_SEQUENCE: u8 = 0x30;
const DER_LONG_FORM: u8 = 0x80;

/// RSA key produced by a [`PublicKeyReconstructor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconstructedKey {
	/// Constructed public key.
	pub key: RsaPublicKey,
	/// Declared key size in bits.
	pub size_in_bits: usize,
}

/// Builds public keys from key set material.
pub trait PublicKeyReconstructor
where
	Self: Send + Sync,
{
	/// Returns `None` when the material cannot form a public key.
	fn reconstruct(&self, modulus: &str, exponent: &str) -> Option<ReconstructedKey>;
}

/// Default reconstructor backed by the `rsa` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct RsaKeyReconstructor;
impl PublicKeyReconstructor for RsaKeyReconstructor {
	fn reconstruct(&self, modulus: &str, exponent: &str) -> Option<ReconstructedKey> {
		let der = encode_rsa_public_key(modulus.as_bytes(), exponent.as_bytes());
		let parsed = pkcs1::RsaPublicKey::from_der(&der).ok()?;
		let size_in_bits = modulus.len() * 8;
		let n = BigUint::from_bytes_be(parsed.modulus.as_bytes());

		if n.bits() > size_in_bits {
			return None;
		}

		// Raw-byte exponents may be even, so the exponent is not range-checked.
		let key = RsaPublicKey::new_unchecked(n, BigUint::from_bytes_be(parsed.public_exponent.as_bytes()));

		Some(ReconstructedKey { key, size_in_bits })
	}
}

/// Encodes a DER length field using the minimal number of bytes.
pub fn der_length(len: usize) -> Vec<u8> {
	if len < usize::from(DER_LONG_FORM) {
		return vec![len as u8];
	}

	let bytes = len.to_be_bytes();
	let first = bytes.iter().position(|byte| *byte != 0).unwrap_or(bytes.len() - 1);
	let significant = &bytes[first..];
	let mut out = Vec::with_capacity(significant.len() + 1);

	out.push(DER_LONG_FORM | significant.len() as u8);
	out.extend_from_slice(significant);

	out
}

/// Encodes `SEQUENCE { INTEGER modulus, INTEGER exponent }`.
pub fn encode_rsa_public_key(modulus: &[u8], exponent: &[u8]) -> Vec<u8> {
	let mut body = tlv(DER_INTEGER, modulus);

	body.extend(tlv(DER_INTEGER, exponent));

	tlv(DER_SEQUENCE, &body)
}

fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
	let length = der_length(value.len());
	let mut out = Vec::with_capacity(1 + length.len() + value.len());

	out.push(tag);
	out.extend(length);
	out.extend_from_slice(value);

	out
}
