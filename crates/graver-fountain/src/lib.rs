//! Rateless fountain codec for animated QR transfer.
//!
//! A message too large for a single QR frame is split into `seq_len` pure
//! fragments. [`encode`] then produces an unbounded stream of frames: frames
//! `1..=seq_len` carry the pure fragments themselves, later frames carry XOR
//! mixtures of a pseudo-randomly chosen subset. [`Decoder`] reassembles the
//! message from any sufficient subset of frames, in any order.
//!
//! Every frame is a deterministically CBOR-encoded array
//! `[seq_num, seq_len, message_len, checksum, payload]`, so the same inputs
//! always produce byte-identical frames.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod fragment;
pub mod xoshiro;

mod choose;
mod sampler;

pub use decoder::Decoder;
pub use encoder::{Encoder, encode};
pub use error::{FountainError, Result};
pub use fragment::Fragment;

use crc::{CRC_32_ISO_HDLC, Crc};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC-32/IEEE over the whole message, used as the frame checksum and as
/// the nonce for mix selection.
pub fn checksum(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

pub(crate) fn xor_into(target: &mut [u8], source: &[u8]) {
    debug_assert_eq!(target.len(), source.len());
    for (t, s) in target.iter_mut().zip(source) {
        *t ^= s;
    }
}
