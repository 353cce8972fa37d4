//! crypto-hdkey: Hierarchical Deterministic Key (BIP32)
//! BCR-2020-007: <https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-007-hdkey.md>
//!
//! Decoding accepts the tag 303 envelope but does not require it, matching
//! wallets that emit bare HD-key maps at the top level. Standalone encoding
//! is untagged; the crypto-output encoder writes the tag itself.

use bitcoin::NetworkKind;
use bitcoin::bip32::{ChainCode, ChildNumber, Fingerprint, Xpub};
use bitcoin::secp256k1::PublicKey;
use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use crate::error::{Result, ToUrError, UrError};
use crate::keypath::{Derivation, Keypath, Path};
use crate::registry::CRYPTO_HDKEY;

/// Key data is a compressed public key.
const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Chain code length per BIP32.
const CHAIN_CODE_LEN: usize = 32;

/// A validated extended public key with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// Fingerprint of the master key this key derives from.
    pub master_fingerprint: u32,
    /// Origin path from the master to this key.
    pub derivation_path: Path,
    /// Address-level derivation suffix (e.g. `0/*`), possibly empty.
    pub children: Vec<Derivation>,
    /// The extended key itself, mainnet-encoded.
    pub key: Xpub,
}

impl KeyDescriptor {
    /// Decode from CBOR, with or without the tag 303 envelope.
    pub fn from_cbor(cbor: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(cbor);
        if decoder.datatype().map_err_cbor_decode()? == Type::Tag {
            let tag = decoder.tag().map_err_cbor_decode()?;
            if tag != Tag::new(CRYPTO_HDKEY) {
                return Err(UrError::InvalidTag { expected: CRYPTO_HDKEY, actual: tag.as_u64() });
            }
        }
        Self::decode_from(&mut decoder)
    }

    /// Decode the HD-key map from the decoder's current position. Any tag
    /// envelope must already have been consumed.
    pub(crate) fn decode_from(decoder: &mut Decoder<'_>) -> Result<Self> {
        let map_len = decoder
            .map()
            .map_err_cbor_decode()?
            .ok_or_else(|| UrError::CborDecode("expected definite-length map".to_string()))?;

        let mut key_data: Option<Vec<u8>> = None;
        let mut chain_code: Option<Vec<u8>> = None;
        let mut origin = Keypath::default();
        let mut children = Keypath::default();
        let mut parent_fingerprint = 0u32;

        for _ in 0..map_len {
            let key = decoder.u32().map_err_cbor_decode()?;
            match key {
                // is_master and is_private carry no information for a
                // 33-byte public key; read and discard
                1 | 2 => {
                    decoder.bool().map_err_cbor_decode()?;
                }
                3 => key_data = Some(decoder.bytes().map_err_cbor_decode()?.to_vec()),
                4 => chain_code = Some(decoder.bytes().map_err_cbor_decode()?.to_vec()),
                6 => origin = Keypath::decode_from(decoder)?,
                7 => children = Keypath::decode_from(decoder)?,
                8 => parent_fingerprint = decoder.u32().map_err_cbor_decode()?,
                _ => {
                    // skip unknown fields (e.g. use-info) for forward
                    // compatibility
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        let key_data = key_data.ok_or(UrError::MissingField("key_data"))?;
        if key_data.len() != COMPRESSED_PUBKEY_LEN {
            return Err(UrError::InvalidKeyDataLength {
                expected: COMPRESSED_PUBKEY_LEN,
                actual: key_data.len(),
            });
        }
        let chain_code = chain_code.ok_or(UrError::MissingField("chain_code"))?;
        if chain_code.len() != CHAIN_CODE_LEN {
            return Err(UrError::InvalidChainCodeLength(chain_code.len()));
        }

        let derivation_path = origin.to_origin_path()?;
        if origin.depth != 0 && origin.depth as usize != derivation_path.len() {
            return Err(UrError::DepthMismatch {
                declared: origin.depth,
                path_len: derivation_path.len(),
            });
        }

        let public_key = PublicKey::from_slice(&key_data)
            .map_err(|e| UrError::InvalidKeyData(e.to_string()))?;
        let chain_code_bytes: [u8; CHAIN_CODE_LEN] =
            chain_code.as_slice().try_into().expect("length checked above");

        let key = Xpub {
            network: NetworkKind::Main,
            depth: origin.depth,
            parent_fingerprint: Fingerprint::from(parent_fingerprint.to_be_bytes()),
            child_number: ChildNumber::from(derivation_path.last_component()),
            public_key,
            chain_code: ChainCode::from(chain_code_bytes),
        };

        Ok(Self {
            master_fingerprint: origin.source_fingerprint,
            derivation_path,
            children: children.components,
            key,
        })
    }

    /// Encode as an untagged HD-key map.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer);
        self.encode_into(&mut encoder)?;
        Ok(buffer)
    }

    pub(crate) fn encode_into(&self, encoder: &mut Encoder<&mut Vec<u8>>) -> Result<()> {
        let origin = Keypath::from_origin_path(
            &self.derivation_path,
            self.master_fingerprint,
            self.key.depth,
        );
        let children =
            Keypath { components: self.children.clone(), source_fingerprint: 0, depth: 0 };
        let parent_fingerprint = u32::from_be_bytes(self.key.parent_fingerprint.to_bytes());

        let field_count = 2
            + !origin.is_empty() as u64
            + !children.is_empty() as u64
            + (parent_fingerprint != 0) as u64;
        encoder.map(field_count).map_err_cbor_encode()?;

        encoder.u32(3).map_err_cbor_encode()?;
        encoder.bytes(&self.key.public_key.serialize()).map_err_cbor_encode()?;

        encoder.u32(4).map_err_cbor_encode()?;
        encoder.bytes(&self.key.chain_code.to_bytes()).map_err_cbor_encode()?;

        if !origin.is_empty() {
            encoder.u32(6).map_err_cbor_encode()?;
            origin.encode_into(encoder)?;
        }
        if !children.is_empty() {
            encoder.u32(7).map_err_cbor_encode()?;
            children.encode_into(encoder)?;
        }
        if parent_fingerprint != 0 {
            encoder.u32(8).map_err_cbor_encode()?;
            encoder.u32(parent_fingerprint).map_err_cbor_encode()?;
        }
        Ok(())
    }
}
