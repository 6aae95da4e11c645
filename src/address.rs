//! Ethereum address derivation from KMS public keys.
//!
//! KMS hands back secp256k1 public keys as DER `SubjectPublicKeyInfo`. The
//! account address is the last 20 bytes of `keccak256(X || Y)` over the
//! uncompressed point, rendered with the EIP-55 mixed-case checksum.

use crate::error::{ProvisionError, Result};
use alloy::primitives::{keccak256, Address};
use spki::der::Decode;
use spki::SubjectPublicKeyInfoRef;

/// SEC1 tag for an uncompressed curve point.
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;
const UNCOMPRESSED_POINT_LEN: usize = 65;

/// Derive the checksummed address (`0x`-prefixed) for a DER encoded public key.
pub fn derive_address(der_public_key: &[u8]) -> Result<String> {
    let point = uncompressed_point(der_public_key)?;
    Ok(point_to_address(&point[1..]).to_checksum(None))
}

/// Extract the raw uncompressed point from a `SubjectPublicKeyInfo`.
pub fn uncompressed_point(der_public_key: &[u8]) -> Result<&[u8]> {
    let info = SubjectPublicKeyInfoRef::from_der(der_public_key)
        .map_err(|e| {
            ProvisionError::MalformedPublicKey(format!("invalid SubjectPublicKeyInfo: {e}"))
        })?;

    // `as_bytes` is only defined for octet-aligned bit strings.
    let point = info.subject_public_key.as_bytes().ok_or_else(|| {
        ProvisionError::MalformedPublicKey("subjectPublicKey has unused bits".to_string())
    })?;

    if point.len() != UNCOMPRESSED_POINT_LEN {
        return Err(ProvisionError::MalformedPublicKey(format!(
            "expected {} byte uncompressed point, got {} bytes",
            UNCOMPRESSED_POINT_LEN,
            point.len()
        )));
    }
    if point[0] != UNCOMPRESSED_POINT_TAG {
        return Err(ProvisionError::MalformedPublicKey(format!(
            "expected uncompressed point tag 0x04, got 0x{:02x}",
            point[0]
        )));
    }

    Ok(point)
}

fn point_to_address(xy: &[u8]) -> Address {
    let digest = keccak256(xy);
    Address::from_slice(&digest[12..])
}
