//! SeedQR codecs for BIP-39 mnemonics.
//!
//! Two encodings are in circulation: the standard form is a printable
//! string of four-digit word indexes, the compact form is the raw entropy
//! bytes (the checksum words are recomputed on read). Only 12- and 24-word
//! mnemonics travel this way.

use bip39::{Language, Mnemonic};
use bitvec::{field::BitField as _, order::Msb0, vec::BitVec};
use sha2::{Digest, Sha256};

/// A mnemonic recovered from a scanned SeedQR payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedQr {
    Standard(Mnemonic),
    Compact(Mnemonic),
}

impl SeedQr {
    /// Auto-detect and parse a scanned payload.
    ///
    /// Standard payloads are 48 or 96 ASCII digits; compact payloads are
    /// exactly 16 or 32 bytes. Anything else, including a recognized shape
    /// whose checksum fails, is not a SeedQR.
    pub fn parse(data: &[u8]) -> Option<Self> {
        match data.len() {
            48 | 96 if data.iter().all(u8::is_ascii_digit) => {
                parse_standard(data).map(Self::Standard)
            }
            16 | 32 => parse_compact(data).map(Self::Compact),
            _ => None,
        }
    }

    pub fn mnemonic(&self) -> &Mnemonic {
        match self {
            Self::Standard(mnemonic) | Self::Compact(mnemonic) => mnemonic,
        }
    }

    pub fn into_mnemonic(self) -> Mnemonic {
        match self {
            Self::Standard(mnemonic) | Self::Compact(mnemonic) => mnemonic,
        }
    }

    /// The payload bytes of this QR in its own encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Standard(mnemonic) => qr(mnemonic),
            Self::Compact(mnemonic) => compact_qr(mnemonic),
        }
    }
}

/// Encode as a standard SeedQR: each word index as four zero-padded
/// decimal digits.
pub fn qr(mnemonic: &Mnemonic) -> Vec<u8> {
    let mut out = Vec::with_capacity(mnemonic.word_count() * 4);
    for index in word_indexes(mnemonic) {
        out.extend_from_slice(format!("{index:04}").as_bytes());
    }
    out
}

/// Encode as a compact SeedQR: the entropy bytes alone.
pub fn compact_qr(mnemonic: &Mnemonic) -> Vec<u8> {
    mnemonic.to_entropy()
}

fn parse_standard(data: &[u8]) -> Option<Mnemonic> {
    let text = std::str::from_utf8(data).ok()?;
    let word_list = Language::English.word_list();

    let mut phrase = String::with_capacity(data.len() * 2);
    for block in text.as_bytes().chunks(4) {
        let digits = std::str::from_utf8(block).ok()?;
        let index: usize = digits.parse().ok()?;
        if index > 2047 {
            return None;
        }
        if !phrase.is_empty() {
            phrase.push(' ');
        }
        phrase.push_str(word_list[index]);
    }

    // checksum validation happens here
    Mnemonic::parse_in(Language::English, &phrase).ok()
}

fn parse_compact(data: &[u8]) -> Option<Mnemonic> {
    Mnemonic::from_entropy_in(Language::English, data).ok()
}

/// The 11-bit word indexes of a mnemonic: entropy followed by its checksum
/// bits, chunked MSB-first.
fn word_indexes(mnemonic: &Mnemonic) -> Vec<u16> {
    let mut data = mnemonic.to_entropy();
    data.push(checksum_byte(&data));

    let bits = BitVec::<u8, Msb0>::from_vec(data);
    bits.chunks(11)
        .filter(|chunk| chunk.len() == 11)
        .map(|chunk| chunk.load_be::<u16>())
        .collect()
}

/// The BIP-39 checksum bits of `entropy`, left-aligned in one byte.
fn checksum_byte(entropy: &[u8]) -> u8 {
    let hash = Sha256::digest(entropy);
    let checksum_bits = entropy.len() * 8 / 32;
    hash[0] >> (8 - checksum_bits) << (8 - checksum_bits)
}
