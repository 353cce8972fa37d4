//! CBOR tag assignments from BCR-2020-006/007/010 and type dispatch.

use minicbor::Decoder;

use crate::crypto_hdkey::KeyDescriptor;
use crate::crypto_output::OutputDescriptor;
use crate::crypto_seed::CryptoSeed;
use crate::error::{Result, ToUrError, UrError};

/// crypto-hdkey tag (BCR-2020-007)
pub const CRYPTO_HDKEY: u64 = 303;

/// crypto-keypath tag (BCR-2020-007)
pub const CRYPTO_KEYPATH: u64 = 304;

// Script expression tags (BCR-2020-010)
/// script-hash (sh) - P2SH wrapper
pub const SCRIPT_HASH: u64 = 400;

/// witness-script-hash (wsh) - P2WSH
pub const WITNESS_SCRIPT_HASH: u64 = 401;

/// pay-to-pubkey-hash (pkh) - P2PKH (BIP44)
pub const PAY_TO_PUBKEY_HASH: u64 = 403;

/// witness-pubkey-hash (wpkh) - P2WPKH (BIP84)
pub const WITNESS_PUBKEY_HASH: u64 = 404;

/// multisig
pub const MULTI: u64 = 406;

/// multisig with lexicographically sorted keys
pub const SORTED_MULTI: u64 = 407;

/// taproot (tr) - P2TR (BIP86)
pub const TAPROOT: u64 = 409;

/// A decoded wallet artifact, dispatched on the UR type string.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Raw seed entropy from a crypto-seed document.
    Seed(CryptoSeed),
    /// A single extended key from a crypto-hdkey document.
    HdKey(KeyDescriptor),
    /// An output descriptor from a crypto-output document.
    Output(OutputDescriptor),
    /// An opaque byte payload from a bytes document.
    Bytes(Vec<u8>),
}

/// Parse the CBOR payload of a reassembled UR document.
///
/// `ur_type` is the type component of the enclosing UR transport
/// (for example `crypto-output` in `ur:crypto-output/...`).
pub fn parse(ur_type: &str, cbor: &[u8]) -> Result<Artifact> {
    match ur_type {
        "crypto-seed" => Ok(Artifact::Seed(CryptoSeed::from_cbor(cbor)?)),
        "crypto-hdkey" => Ok(Artifact::HdKey(KeyDescriptor::from_cbor(cbor)?)),
        "crypto-output" => Ok(Artifact::Output(OutputDescriptor::from_cbor(cbor)?)),
        "bytes" => {
            let mut decoder = Decoder::new(cbor);
            let content = decoder.bytes().map_err_cbor_decode()?.to_vec();
            Ok(Artifact::Bytes(content))
        }
        _ => Err(UrError::UnsupportedType(ur_type.to_string())),
    }
}
