//! crypto-output: output descriptors over HD keys
//! BCR-2020-010: <https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-010-output-desc.md>
//!
//! A descriptor document is a chain of nested tags ending in either a
//! single HD key or a multisig map. The chain is peeled in one pass and
//! matched against the closed table of legal script shapes; anything else
//! is rejected.

use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use crate::crypto_hdkey::KeyDescriptor;
use crate::error::{Result, ToUrError, UrError};
use crate::keypath::Path;
use crate::registry::{
    CRYPTO_HDKEY, MULTI, PAY_TO_PUBKEY_HASH, SCRIPT_HASH, SORTED_MULTI, TAPROOT,
    WITNESS_PUBKEY_HASH, WITNESS_SCRIPT_HASH,
};

/// The script template of an output descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Unknown,
    P2sh,
    P2shP2wsh,
    P2shP2wpkh,
    P2pkh,
    P2wsh,
    P2wpkh,
    P2tr,
}

impl std::fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::P2sh => "Legacy (P2SH)",
            Self::P2shP2wsh => "Nested Segwit (P2SH-P2WSH)",
            Self::P2shP2wpkh => "Nested Segwit (P2SH-P2WPKH)",
            Self::P2pkh => "Legacy (P2PKH)",
            Self::P2wsh => "Segwit (P2WSH)",
            Self::P2wpkh => "Segwit (P2WPKH)",
            Self::P2tr => "Taproot (P2TR)",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// An output descriptor: a script template over one or more HD keys.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDescriptor {
    pub script_type: ScriptKind,
    /// Number of keys required to sign; 1 for single-sig.
    pub threshold: u32,
    /// Whether a multisig sorts keys at address derivation (sortedmulti).
    pub sorted: bool,
    pub keys: Vec<KeyDescriptor>,
}

impl OutputDescriptor {
    pub fn is_multisig(&self) -> bool {
        self.keys.len() > 1
    }

    /// The standard origin path for this descriptor's script shape, per
    /// BIP-44/45/48/49/84/86. `None` when no standard applies.
    pub fn derivation_path(&self) -> Option<Path> {
        let h = Path::hardened;
        let path = match (self.script_type, self.is_multisig()) {
            (ScriptKind::P2pkh, false) => vec![h(44), h(0), h(0)],
            (ScriptKind::P2shP2wpkh, false) => vec![h(49), h(0), h(0)],
            (ScriptKind::P2wpkh, false) => vec![h(84), h(0), h(0)],
            (ScriptKind::P2tr, false) => vec![h(86), h(0), h(0)],
            (ScriptKind::P2sh, true) => vec![h(45)],
            (ScriptKind::P2shP2wsh, true) => vec![h(48), h(0), h(0), h(1)],
            (ScriptKind::P2wsh, true) => vec![h(48), h(0), h(0), h(2)],
            _ => return None,
        };
        Some(Path(path))
    }

    pub fn from_cbor(cbor: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(cbor);

        // peel the outer tag chain down to the first non-tag item
        let mut chain = Vec::new();
        while decoder.datatype().map_err_cbor_decode()? == Type::Tag {
            chain.push(decoder.tag().map_err_cbor_decode()?.as_u64());
        }

        let is_multi = |tag: u64| tag == MULTI || tag == SORTED_MULTI;
        let (script_type, function) = match chain.as_slice() {
            &[SCRIPT_HASH, WITNESS_SCRIPT_HASH, f] if is_multi(f) => (ScriptKind::P2shP2wsh, f),
            &[SCRIPT_HASH, WITNESS_PUBKEY_HASH, CRYPTO_HDKEY] => {
                (ScriptKind::P2shP2wpkh, CRYPTO_HDKEY)
            }
            &[SCRIPT_HASH, f] if is_multi(f) => (ScriptKind::P2sh, f),
            &[WITNESS_SCRIPT_HASH, f] if is_multi(f) => (ScriptKind::P2wsh, f),
            &[WITNESS_PUBKEY_HASH, CRYPTO_HDKEY] => (ScriptKind::P2wpkh, CRYPTO_HDKEY),
            &[PAY_TO_PUBKEY_HASH, CRYPTO_HDKEY] => (ScriptKind::P2pkh, CRYPTO_HDKEY),
            &[TAPROOT, CRYPTO_HDKEY] => (ScriptKind::P2tr, CRYPTO_HDKEY),
            _ => {
                let chain = chain
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(UrError::UnknownScriptTag(chain));
            }
        };

        let (threshold, sorted, keys) = if function == CRYPTO_HDKEY {
            (1, false, vec![KeyDescriptor::decode_from(&mut decoder)?])
        } else {
            let (threshold, keys) = decode_multi(&mut decoder)?;
            (threshold, function == SORTED_MULTI, keys)
        };

        if threshold == 0 || threshold as usize > keys.len() {
            return Err(UrError::InvalidThreshold { threshold, keys: keys.len() });
        }

        Ok(Self { script_type, threshold, sorted, keys })
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let script_tags: &[u64] = match self.script_type {
            ScriptKind::P2sh => &[SCRIPT_HASH],
            ScriptKind::P2shP2wsh => &[SCRIPT_HASH, WITNESS_SCRIPT_HASH],
            ScriptKind::P2shP2wpkh => &[SCRIPT_HASH, WITNESS_PUBKEY_HASH],
            ScriptKind::P2pkh => &[PAY_TO_PUBKEY_HASH],
            ScriptKind::P2wsh => &[WITNESS_SCRIPT_HASH],
            ScriptKind::P2wpkh => &[WITNESS_PUBKEY_HASH],
            ScriptKind::P2tr => &[TAPROOT],
            ScriptKind::Unknown => {
                return Err(UrError::InvalidOperation("cannot encode an unknown script kind"));
            }
        };
        let Some(first_key) = self.keys.first() else {
            return Err(UrError::InvalidOperation("descriptor has no keys"));
        };

        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer);
        for &tag in script_tags {
            encoder.tag(Tag::new(tag)).map_err_cbor_encode()?;
        }

        if self.is_multisig() {
            let function = if self.sorted { SORTED_MULTI } else { MULTI };
            encoder.tag(Tag::new(function)).map_err_cbor_encode()?;
            encoder.map(2).map_err_cbor_encode()?;
            encoder.u32(1).map_err_cbor_encode()?;
            encoder.u32(self.threshold).map_err_cbor_encode()?;
            encoder.u32(2).map_err_cbor_encode()?;
            encoder.array(self.keys.len() as u64).map_err_cbor_encode()?;
            for key in &self.keys {
                encoder.tag(Tag::new(CRYPTO_HDKEY)).map_err_cbor_encode()?;
                key.encode_into(&mut encoder)?;
            }
        } else {
            encoder.tag(Tag::new(CRYPTO_HDKEY)).map_err_cbor_encode()?;
            first_key.encode_into(&mut encoder)?;
        }
        Ok(buffer)
    }
}

/// Decode a multi/sorted-multi payload `{1: threshold, 2: [hdkey, ...]}`.
fn decode_multi(decoder: &mut Decoder<'_>) -> Result<(u32, Vec<KeyDescriptor>)> {
    let map_len = decoder
        .map()
        .map_err_cbor_decode()?
        .ok_or_else(|| UrError::CborDecode("expected definite-length map".to_string()))?;

    let mut threshold = 0u32;
    let mut keys = Vec::new();
    for _ in 0..map_len {
        let key = decoder.u32().map_err_cbor_decode()?;
        match key {
            1 => threshold = decoder.u32().map_err_cbor_decode()?,
            2 => {
                let count = decoder
                    .array()
                    .map_err_cbor_decode()?
                    .ok_or_else(|| {
                        UrError::CborDecode("expected definite-length array".to_string())
                    })?;
                for _ in 0..count {
                    // each key may carry its own tag 303 envelope
                    if decoder.datatype().map_err_cbor_decode()? == Type::Tag {
                        let tag = decoder.tag().map_err_cbor_decode()?;
                        if tag != Tag::new(CRYPTO_HDKEY) {
                            return Err(UrError::InvalidTag {
                                expected: CRYPTO_HDKEY,
                                actual: tag.as_u64(),
                            });
                        }
                    }
                    keys.push(KeyDescriptor::decode_from(decoder)?);
                }
            }
            _ => {
                decoder.skip().map_err_cbor_decode()?;
            }
        }
    }
    Ok((threshold, keys))
}

/// Sort keys in place by their compressed public key bytes, as BIP 383
/// specifies for sortedmulti descriptors. The sort is stable.
pub fn sort_keys(keys: &mut [KeyDescriptor]) {
    keys.sort_by(|a, b| a.key.public_key.serialize().cmp(&b.key.public_key.serialize()));
}
