//! Frame production.

use crate::choose::choose_fragments;
use crate::fragment::Fragment;
use crate::{checksum, xor_into};

/// Encode frame `seq_num` of `message` split into `seq_len` pure fragments.
///
/// Deterministic: the same `(message, seq_num, seq_len)` always yields the
/// same bytes. Callers must pass a non-empty message and 1-based counts;
/// violations are programmer errors.
pub fn encode(message: &[u8], seq_num: u32, seq_len: u32) -> Vec<u8> {
    assert!(!message.is_empty(), "cannot encode an empty message");
    assert!(seq_num >= 1 && seq_len >= 1, "sequence numbers are 1-based");
    assert!(
        u32::try_from(message.len()).is_ok(),
        "message too large for a u32 length prefix"
    );

    let fragment_len = message.len().div_ceil(seq_len as usize);
    let checksum = checksum(message);

    let mut payload = vec![0u8; fragment_len];
    for index in choose_fragments(seq_num, seq_len, checksum) {
        let start = index as usize * fragment_len;
        let end = usize::min(start + fragment_len, message.len());
        // the final pure fragment is shorter than fragment_len; its padding
        // bytes are zero and drop out of the XOR
        if start < message.len() {
            xor_into(&mut payload[..end - start], &message[start..end]);
        }
    }

    Fragment {
        seq_num,
        seq_len,
        message_len: message.len() as u32,
        checksum,
        payload,
    }
    .to_cbor()
}

/// Cursor producing the frame sequence `1, 2, 3, …` for animated display.
///
/// The stream never ends; the receiver stops once its decoder completes.
#[derive(Debug, Clone)]
pub struct Encoder {
    message: Vec<u8>,
    seq_len: u32,
    seq_num: u32,
}

impl Encoder {
    /// Split `message` so no fragment exceeds `max_fragment_len` bytes.
    pub fn new(message: Vec<u8>, max_fragment_len: usize) -> Self {
        assert!(!message.is_empty(), "cannot encode an empty message");
        assert!(max_fragment_len >= 1, "fragments must hold at least one byte");

        let seq_len = message.len().div_ceil(max_fragment_len) as u32;
        Self { message, seq_len, seq_num: 0 }
    }

    /// Number of pure fragments the message was split into.
    pub fn fragment_count(&self) -> u32 {
        self.seq_len
    }

    /// Sequence number of the most recently produced frame.
    pub fn current_index(&self) -> u32 {
        self.seq_num
    }

    pub fn next_part(&mut self) -> Vec<u8> {
        self.seq_num += 1;
        encode(&self.message, self.seq_num, self.seq_len)
    }
}
