//! crypto-seed: raw seed entropy
//! BCR-2020-006: <https://github.com/BlockchainCommons/Research/blob/master/papers/bcr-2020-006-urtypes.md>

use minicbor::{Decoder, Encoder};

use crate::error::{Result, ToUrError, UrError};

/// crypto-seed: an untagged CBOR map `{1: bytes}` carrying seed entropy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoSeed {
    pub payload: Vec<u8>,
}

impl CryptoSeed {
    pub fn new(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer);
        encoder.map(1).map_err_cbor_encode()?;
        encoder.u32(1).map_err_cbor_encode()?;
        encoder.bytes(&self.payload).map_err_cbor_encode()?;
        Ok(buffer)
    }

    pub fn from_cbor(cbor: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(cbor);
        let map_len = decoder
            .map()
            .map_err_cbor_decode()?
            .ok_or_else(|| UrError::CborDecode("expected definite-length map".to_string()))?;

        let mut payload = None;
        for _ in 0..map_len {
            let key = decoder.u32().map_err_cbor_decode()?;
            match key {
                1 => payload = Some(decoder.bytes().map_err_cbor_decode()?.to_vec()),
                _ => {
                    // skip unknown fields (e.g. creation date) for forward
                    // compatibility
                    decoder.skip().map_err_cbor_decode()?;
                }
            }
        }

        let payload = payload.ok_or(UrError::MissingField("payload"))?;
        Ok(Self { payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let seed = CryptoSeed::new(vec![0xC1; 32]);
        let cbor = seed.to_cbor().unwrap();
        assert_eq!(CryptoSeed::from_cbor(&cbor).unwrap(), seed);
    }

    #[test]
    fn encoding_is_untagged() {
        let seed = CryptoSeed::new(vec![0xC1; 16]);
        let cbor = seed.to_cbor().unwrap();
        // map(1), key 1, bytes(16)
        assert_eq!(&cbor[..3], &[0xA1, 0x01, 0x50]);
    }

    #[test]
    fn ignores_unknown_fields() {
        let mut cbor = Vec::new();
        let mut encoder = Encoder::new(&mut cbor);
        encoder.map(2).unwrap();
        encoder.u32(1).unwrap();
        encoder.bytes(&[0xAB; 16]).unwrap();
        encoder.u32(2).unwrap();
        encoder.u64(1_700_000_000).unwrap();

        let seed = CryptoSeed::from_cbor(&cbor).unwrap();
        assert_eq!(seed.payload, vec![0xAB; 16]);
    }

    #[test]
    fn missing_payload_fails() {
        let mut cbor = Vec::new();
        let mut encoder = Encoder::new(&mut cbor);
        encoder.map(1).unwrap();
        encoder.u32(2).unwrap();
        encoder.u64(1_700_000_000).unwrap();

        assert_eq!(CryptoSeed::from_cbor(&cbor), Err(UrError::MissingField("payload")));
    }
}
