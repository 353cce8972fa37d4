use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrError {
    #[error("failed to encode CBOR: {0}")]
    CborEncode(String),

    #[error("failed to decode CBOR: {0}")]
    CborDecode(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid tag: expected {expected}, got {actual}")]
    InvalidTag { expected: u64, actual: u64 },

    #[error("invalid key data length: expected {expected}, got {actual}")]
    InvalidKeyDataLength { expected: usize, actual: usize },

    #[error("invalid chain code length: expected 32, got {0}")]
    InvalidChainCodeLength(usize),

    #[error("invalid public key: {0}")]
    InvalidKeyData(String),

    #[error("malformed derivation path: {0}")]
    MalformedPath(&'static str),

    #[error("declared depth {declared} does not match origin path length {path_len}")]
    DepthMismatch { declared: u8, path_len: usize },

    #[error("unknown or illegal script tag chain: {0}")]
    UnknownScriptTag(String),

    #[error("invalid multisig threshold {threshold} for {keys} keys")]
    InvalidThreshold { threshold: u32, keys: usize },

    #[error("unsupported ur type: {0}")]
    UnsupportedType(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
}

pub type Result<T> = std::result::Result<T, UrError>;

/// Helper trait to convert any error to UrError
pub trait ToUrError<T> {
    fn map_err_cbor_encode(self) -> Result<T>;
    fn map_err_cbor_decode(self) -> Result<T>;
}

impl<T, E: std::fmt::Display> ToUrError<T> for std::result::Result<T, E> {
    fn map_err_cbor_encode(self) -> Result<T> {
        self.map_err(|e| UrError::CborEncode(e.to_string()))
    }

    fn map_err_cbor_decode(self) -> Result<T> {
        self.map_err(|e| UrError::CborDecode(e.to_string()))
    }
}
