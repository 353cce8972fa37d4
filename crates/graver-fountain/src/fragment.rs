//! Wire form of a single fountain frame.
//!
//! A frame is the deterministic CBOR array
//! `[seq_num, seq_len, message_len, checksum, payload]` with definite
//! lengths and minimal integer widths throughout. All pure fragments of a
//! message share one payload size; the final pure fragment is zero-padded
//! up to it.

use minicbor::{Decoder, Encoder};

use crate::error::{FountainError, Result, ToFountainError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// 1-based frame number; values above `seq_len` denote mixed frames.
    pub seq_num: u32,
    /// Number of pure fragments the message was split into.
    pub seq_len: u32,
    /// Exact byte length of the original message.
    pub message_len: u32,
    /// CRC-32/IEEE of the original message.
    pub checksum: u32,
    /// Fragment-sized payload (pure or XOR-mixed).
    pub payload: Vec<u8>,
}

impl Fragment {
    pub fn to_cbor(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.payload.len() + 24);
        let mut encoder = Encoder::new(&mut buffer);
        encoder
            .array(5)
            .and_then(|e| e.u32(self.seq_num))
            .and_then(|e| e.u32(self.seq_len))
            .and_then(|e| e.u32(self.message_len))
            .and_then(|e| e.u32(self.checksum))
            .and_then(|e| e.bytes(&self.payload))
            .expect("writing CBOR to a Vec cannot fail");
        buffer
    }

    pub fn from_cbor(data: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(data);

        let len = decoder
            .array()
            .map_err_fragment()?
            .ok_or_else(|| FountainError::InvalidFragment("indefinite-length array".into()))?;
        if len != 5 {
            return Err(FountainError::InvalidFragment(format!(
                "expected 5-element array, got {len}"
            )));
        }

        let seq_num = decoder.u32().map_err_fragment()?;
        let seq_len = decoder.u32().map_err_fragment()?;
        let message_len = decoder.u32().map_err_fragment()?;
        let checksum = decoder.u32().map_err_fragment()?;
        let payload = decoder.bytes().map_err_fragment()?.to_vec();

        if decoder.position() != data.len() {
            return Err(FountainError::InvalidFragment("trailing data after fragment".into()));
        }

        let fragment = Self { seq_num, seq_len, message_len, checksum, payload };
        fragment.validate()?;
        Ok(fragment)
    }

    fn validate(&self) -> Result<()> {
        if self.seq_num == 0 || self.seq_len == 0 {
            return Err(FountainError::InvalidFragment("sequence numbers are 1-based".into()));
        }
        if self.message_len == 0 || self.payload.is_empty() {
            return Err(FountainError::InvalidFragment("empty message or payload".into()));
        }
        // payload size must be the fragment size the message length implies
        let fragment_len = (self.message_len as usize).div_ceil(self.seq_len as usize);
        if self.payload.len() != fragment_len {
            return Err(FountainError::InvalidFragment(format!(
                "payload is {} bytes, expected {fragment_len}",
                self.payload.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let fragment = Fragment {
            seq_num: 12,
            seq_len: 9,
            message_len: 259,
            checksum: 0xEDA0AE73,
            payload: vec![0xAB; 29],
        };

        let cbor = fragment.to_cbor();
        assert_eq!(Fragment::from_cbor(&cbor).unwrap(), fragment);
    }

    #[test]
    fn parses_reference_frame_header() {
        let data = hex::decode(
            "8505091901031aeda0ae73581dd60b3ec4bbff1b9ffe8a9e7240129377b9d3711ed38d412fbb4442256f",
        )
        .unwrap();
        let fragment = Fragment::from_cbor(&data).unwrap();

        assert_eq!(fragment.seq_num, 5);
        assert_eq!(fragment.seq_len, 9);
        assert_eq!(fragment.message_len, 259);
        assert_eq!(fragment.checksum, 0xEDA0AE73);
        assert_eq!(fragment.payload.len(), 29);
        assert_eq!(fragment.to_cbor(), data);
    }

    #[test]
    fn rejects_wrong_arity() {
        // [1, 2, 3] -- three elements instead of five
        let data = [0x83, 0x01, 0x02, 0x03];
        assert!(matches!(
            Fragment::from_cbor(&data),
            Err(FountainError::InvalidFragment(_))
        ));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let fragment = Fragment {
            seq_num: 1,
            seq_len: 1,
            message_len: 3,
            checksum: 1,
            payload: vec![1, 2, 3],
        };
        let mut cbor = fragment.to_cbor();
        cbor.push(0x00);
        assert!(matches!(
            Fragment::from_cbor(&cbor),
            Err(FountainError::InvalidFragment(_))
        ));
    }

    #[test]
    fn rejects_payload_size_mismatch() {
        let fragment = Fragment {
            seq_num: 1,
            seq_len: 2,
            message_len: 10,
            checksum: 1,
            payload: vec![0; 7],
        };
        let cbor = fragment.to_cbor();
        assert!(matches!(
            Fragment::from_cbor(&cbor),
            Err(FountainError::InvalidFragment(_))
        ));
    }
}
