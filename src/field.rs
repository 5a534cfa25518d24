//! Field element conversions and hashing primitives.
//!
//! Everything in the protocol lives in the Pallas base field: identity
//! secrets, commitments, tree nodes, nullifiers, and the hashed forms of
//! byte-domain values (signals, epoch scopes). Byte-domain material is
//! folded into the field via a domain-separated SHA3-256 digest; field
//! elements that travel over the wire are serialized as the canonical
//! little-endian representation in hex.

use halo2_gadgets::poseidon::primitives::{
    self as poseidon, ConstantLength, P128Pow5T3 as PoseidonSpec,
};
use pasta_curves::group::ff::PrimeField;
use pasta_curves::pallas;
use sha3::{Digest, Sha3_256};

use crate::error::ProtocolError;

pub const HASH_SIZE: usize = 32;

const BASE_U64: u64 = 256;

const DOMAIN_SIGNAL: &[u8] = b"anon-greeter/signal/v1";
const DOMAIN_SCOPE: &[u8] = b"anon-greeter/scope/v1";

/// Folds 32 bytes into a Pallas field element.
///
/// Interprets the input as a base-256 number reduced modulo the field
/// order. Not the inverse of [`field_to_bytes`]; use this for digest
/// output, and [`field_from_hex`] for canonical representations.
#[inline]
#[must_use]
pub fn bytes_to_field(bytes: &[u8; HASH_SIZE]) -> pallas::Base {
    let mut value = pallas::Base::zero();
    let base = pallas::Base::from(BASE_U64);

    for &byte in bytes.iter() {
        value = value * base + pallas::Base::from(byte as u64);
    }

    value
}

/// Canonical 32-byte little-endian representation of a field element.
#[inline]
#[must_use]
pub fn field_to_bytes(field: pallas::Base) -> [u8; HASH_SIZE] {
    let mut bytes = [0u8; HASH_SIZE];
    let repr = field.to_repr();
    bytes.copy_from_slice(repr.as_ref());
    bytes
}

/// Hex encoding of the canonical field representation.
#[must_use]
pub fn field_to_hex(field: pallas::Base) -> String {
    hex::encode(field_to_bytes(field))
}

/// Parses a hex string produced by [`field_to_hex`] back into a field
/// element. Rejects wrong lengths and non-canonical representations.
pub fn field_from_hex(input: &str) -> Result<pallas::Base, ProtocolError> {
    let bytes = decode_hex_32(input, "field element")?;
    let mut repr = <pallas::Base as PrimeField>::Repr::default();
    repr.as_mut().copy_from_slice(&bytes);
    Option::<pallas::Base>::from(pallas::Base::from_repr(repr)).ok_or_else(|| {
        ProtocolError::MalformedBundle(format!(
            "hex string {input:?} is not a canonical field element"
        ))
    })
}

/// Decodes a hex string (with optional 0x prefix) into exactly 32 bytes.
pub fn decode_hex_32(input: &str, what: &str) -> Result<[u8; HASH_SIZE], ProtocolError> {
    let stripped = input
        .trim()
        .strip_prefix("0x")
        .or_else(|| input.trim().strip_prefix("0X"))
        .unwrap_or_else(|| input.trim());

    let bytes = hex::decode(stripped)
        .map_err(|e| ProtocolError::MalformedBundle(format!("invalid {what} hex: {e}")))?;

    bytes.as_slice().try_into().map_err(|_| {
        ProtocolError::MalformedBundle(format!(
            "{what} must be {HASH_SIZE} bytes, got {}",
            bytes.len()
        ))
    })
}

/// Poseidon hash of two field elements using the `P128Pow5T3`
/// specification, the same permutation in-circuit tooling uses.
///
/// Hashes identity secrets into commitments, sibling pairs into tree
/// nodes, and (scope, nullifier secret) into nullifier hashes.
#[inline]
#[must_use]
pub fn poseidon_hash(left: pallas::Base, right: pallas::Base) -> pallas::Base {
    let inputs = [left, right];
    poseidon::Hash::<_, PoseidonSpec, ConstantLength<2>, 3, 2>::init().hash(inputs)
}

/// Domain-separated SHA3-256 digest of arbitrary bytes, folded into the
/// field. Distinct domains never collide even on identical payloads.
#[must_use]
pub fn hash_to_field(domain: &[u8], data: &[u8]) -> pallas::Base {
    let mut hasher = Sha3_256::new();
    hasher.update(domain);
    hasher.update(data);
    let digest: [u8; HASH_SIZE] = hasher.finalize().into();
    bytes_to_field(&digest)
}

/// Hash of the greeting payload, bound into the proof as a public input
/// so a proof cannot be replayed with a different payload.
#[inline]
#[must_use]
pub fn signal_hash(signal: &[u8]) -> pallas::Base {
    hash_to_field(DOMAIN_SIGNAL, signal)
}

/// Hash of an external-nullifier scope string (epoch or topic id).
#[inline]
#[must_use]
pub fn scope_to_field(scope: &str) -> pallas::Base {
    hash_to_field(DOMAIN_SCOPE, scope.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_field_distinct_inputs() {
        let a = bytes_to_field(&[1u8; 32]);
        let b = bytes_to_field(&[2u8; 32]);
        assert_ne!(a, b);
        assert_ne!(a, pallas::Base::zero());
    }

    #[test]
    fn test_field_hex_round_trip() {
        let value = pallas::Base::from(123_456_789u64);
        let encoded = field_to_hex(value);
        assert_eq!(encoded.len(), 64);
        assert_eq!(field_from_hex(&encoded).unwrap(), value);
    }

    #[test]
    fn test_field_from_hex_accepts_prefix() {
        let value = pallas::Base::from(7u64);
        let encoded = format!("0x{}", field_to_hex(value));
        assert_eq!(field_from_hex(&encoded).unwrap(), value);
    }

    #[test]
    fn test_field_from_hex_rejects_wrong_length() {
        assert!(field_from_hex("abcd").is_err());
    }

    #[test]
    fn test_field_from_hex_rejects_non_hex() {
        let bad = "zz".repeat(32);
        assert!(field_from_hex(&bad).is_err());
    }

    #[test]
    fn test_poseidon_hash_deterministic_and_ordered() {
        let left = pallas::Base::from(1);
        let right = pallas::Base::from(2);
        assert_eq!(poseidon_hash(left, right), poseidon_hash(left, right));
        assert_ne!(poseidon_hash(left, right), poseidon_hash(right, left));
    }

    #[test]
    fn test_domain_separation() {
        // Same payload under different domains must not collide.
        assert_ne!(signal_hash(b"epoch-1"), scope_to_field("epoch-1"));
    }

    #[test]
    fn test_signal_hash_binds_payload() {
        assert_ne!(signal_hash(b"hello"), signal_hash(b"hello!"));
        assert_eq!(signal_hash(b"hello"), signal_hash(b"hello"));
    }
}
