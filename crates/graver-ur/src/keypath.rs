//! Key paths (CBOR tag 304) and derivation path components.
//!
//! The components list is heterogeneous: each entry is an `(index, hardened)`
//! pair where the index is a plain uint (literal child), an empty array
//! (wildcard) or a two-element array (range). Origin paths admit only
//! literal children; the children suffix of a key may use all three.

use std::fmt;

use minicbor::data::{Tag, Type};
use minicbor::{Decoder, Encoder};

use crate::error::{Result, ToUrError, UrError};
use crate::registry::CRYPTO_KEYPATH;

/// BIP32 hardened derivation flag (bit 31 set)
pub const HARDENED_FLAG: u32 = 0x8000_0000;

/// Mask to extract the index without the hardened flag
pub const INDEX_MASK: u32 = 0x7FFF_FFFF;

/// Check if a BIP32 path component is hardened
pub fn is_hardened(component: u32) -> bool {
    component & HARDENED_FLAG != 0
}

/// Extract the index from a BIP32 path component (strips hardened flag)
pub fn component_index(component: u32) -> u32 {
    component & INDEX_MASK
}

/// One entry of a children path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// A literal child index, without the hardening offset.
    Child { index: u32, hardened: bool },
    /// Any child index (`*` in descriptor notation).
    Wildcard { hardened: bool },
    /// An inclusive child index range.
    Range { start: u32, end: u32, hardened: bool },
}

/// A BIP32 origin path of raw components, hardened bit included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(pub Vec<u32>);

impl Path {
    pub fn hardened(index: u32) -> u32 {
        HARDENED_FLAG | index
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The last component, or 0 for an empty path. Used as the child number
    /// of the key the path leads to.
    pub fn last_component(&self) -> u32 {
        self.0.last().copied().unwrap_or(0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for &component in &self.0 {
            write!(f, "/{}", component_index(component))?;
            if is_hardened(component) {
                write!(f, "h")?;
            }
        }
        Ok(())
    }
}

/// Wire form of a key path: components plus optional source fingerprint
/// and depth.
/// CBOR structure: #6.304({?1: [components], ?2: uint, ?3: uint})
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keypath {
    pub components: Vec<Derivation>,
    /// Fingerprint of the root the path starts from (0 when absent).
    pub source_fingerprint: u32,
    /// Depth of the derived key in the tree (0 when absent).
    pub depth: u8,
}

impl Keypath {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.source_fingerprint == 0 && self.depth == 0
    }

    /// Interpret the components as an origin path: only literal children
    /// are allowed there.
    pub fn to_origin_path(&self) -> Result<Path> {
        let mut path = Vec::with_capacity(self.components.len());
        for derivation in &self.components {
            match *derivation {
                Derivation::Child { index, hardened } => {
                    path.push(if hardened { index | HARDENED_FLAG } else { index });
                }
                _ => {
                    return Err(UrError::MalformedPath(
                        "wildcards and ranges are not allowed in an origin path",
                    ));
                }
            }
        }
        Ok(Path(path))
    }

    /// Build an origin keypath from raw path components.
    pub fn from_origin_path(path: &Path, source_fingerprint: u32, depth: u8) -> Self {
        let components = path
            .0
            .iter()
            .map(|&component| Derivation::Child {
                index: component_index(component),
                hardened: is_hardened(component),
            })
            .collect();
        Self { components, source_fingerprint, depth }
    }

    pub(crate) fn encode_into(&self, encoder: &mut Encoder<&mut Vec<u8>>) -> Result<()> {
        encoder.tag(Tag::new(CRYPTO_KEYPATH)).map_err_cbor_encode()?;

        let field_count = !self.components.is_empty() as u64
            + (self.source_fingerprint != 0) as u64
            + (self.depth != 0) as u64;
        encoder.map(field_count).map_err_cbor_encode()?;

        if !self.components.is_empty() {
            encoder.u32(1).map_err_cbor_encode()?;
            // two items per component: the index form and the hardened flag
            encoder.array(self.components.len() as u64 * 2).map_err_cbor_encode()?;
            for derivation in &self.components {
                match *derivation {
                    Derivation::Child { index, hardened } => {
                        encoder.u32(index).map_err_cbor_encode()?;
                        encoder.bool(hardened).map_err_cbor_encode()?;
                    }
                    Derivation::Wildcard { hardened } => {
                        encoder.array(0).map_err_cbor_encode()?;
                        encoder.bool(hardened).map_err_cbor_encode()?;
                    }
                    Derivation::Range { start, end, hardened } => {
                        encoder.array(2).map_err_cbor_encode()?;
                        encoder.u32(start).map_err_cbor_encode()?;
                        encoder.u32(end).map_err_cbor_encode()?;
                        encoder.bool(hardened).map_err_cbor_encode()?;
                    }
                }
            }
        }
        if self.source_fingerprint != 0 {
            encoder.u32(2).map_err_cbor_encode()?;
            encoder.u32(self.source_fingerprint).map_err_cbor_encode()?;
        }
        if self.depth != 0 {
            encoder.u32(3).map_err_cbor_encode()?;
            encoder.u8(self.depth).map_err_cbor_encode()?;
        }
        Ok(())
    }

    /// Decode a key path, with or without its tag 304 envelope.
    pub(crate) fn decode_from(decoder: &mut Decoder<'_>) -> Result<Self> {
        if decoder.datatype().map_err_cbor_decode()? == Type::Tag {
            let tag = decoder.tag().map_err_cbor_decode()?;
            if tag != Tag::new(CRYPTO_KEYPATH) {
                return Err(UrError::InvalidTag {
                    expected: CRYPTO_KEYPATH,
                    actual: tag.as_u64(),
                });
            }
        }

        let map_len = decoder
            .map()
            .map_err_cbor_decode()?
            .ok_or_else(|| UrError::CborDecode("expected definite-length map".to_string()))?;

        let mut keypath = Keypath::default();
        for _ in 0..map_len {
            let key = decoder.u32().map_err_cbor_decode()?;
            match key {
                1 => keypath.components = decode_components(decoder)?,
                2 => keypath.source_fingerprint = decoder.u32().map_err_cbor_decode()?,
                3 => keypath.depth = decoder.u8().map_err_cbor_decode()?,
                _ => {
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }
        Ok(keypath)
    }
}

fn decode_components(decoder: &mut Decoder<'_>) -> Result<Vec<Derivation>> {
    let item_count = decoder
        .array()
        .map_err_cbor_decode()?
        .ok_or(UrError::MalformedPath("indefinite-length components array"))?;
    if item_count % 2 == 1 {
        return Err(UrError::MalformedPath("odd number of components"));
    }

    let mut components = Vec::with_capacity((item_count / 2) as usize);
    let mut consumed = 0;
    while consumed < item_count {
        let derivation = match decoder.datatype().map_err_cbor_decode()? {
            Type::U8 | Type::U16 | Type::U32 | Type::U64 => {
                let index = decoder.u64().map_err_cbor_decode()?;
                let index =
                    u32::try_from(index).map_err(|_| UrError::MalformedPath("child index out of range"))?;
                Derivation::Child { index, hardened: false }
            }
            Type::Array => {
                let len = decoder
                    .array()
                    .map_err_cbor_decode()?
                    .ok_or(UrError::MalformedPath("indefinite-length component"))?;
                match len {
                    0 => Derivation::Wildcard { hardened: false },
                    2 => {
                        let start = decoder.u64().map_err_cbor_decode()?;
                        let end = decoder.u64().map_err_cbor_decode()?;
                        let (start, end) = match (u32::try_from(start), u32::try_from(end)) {
                            (Ok(start), Ok(end)) => (start, end),
                            _ => return Err(UrError::MalformedPath("range bound out of range")),
                        };
                        Derivation::Range { start, end, hardened: false }
                    }
                    _ => return Err(UrError::MalformedPath("invalid wildcard or range arity")),
                }
            }
            _ => return Err(UrError::MalformedPath("unknown component type")),
        };

        if decoder.datatype().map_err_cbor_decode()? != Type::Bool {
            return Err(UrError::MalformedPath("hardened flag is not a bool"));
        }
        let hardened = decoder.bool().map_err_cbor_decode()?;

        components.push(match derivation {
            Derivation::Child { index, .. } => Derivation::Child { index, hardened },
            Derivation::Wildcard { .. } => Derivation::Wildcard { hardened },
            Derivation::Range { start, end, .. } => Derivation::Range { start, end, hardened },
        });
        consumed += 2;
    }
    Ok(components)
}
