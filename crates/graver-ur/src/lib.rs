//! Registry of UR wallet document types.
//!
//! Parses and emits the tagged-CBOR documents hardware wallets exchange
//! over animated QR codes: `crypto-seed` (raw entropy), `crypto-hdkey`
//! (BIP32 extended keys) and `crypto-output` (single-sig and multisig
//! output descriptors). Encoding is deterministic CBOR throughout, so the
//! same artifact always produces the same bytes.
//!
//! The text transport around these documents (`ur:type/...`, bytewords)
//! is handled elsewhere; this crate sees reassembled CBOR payloads.

pub mod crypto_hdkey;
pub mod crypto_output;
pub mod crypto_seed;
pub mod error;
pub mod keypath;
pub mod registry;

pub use crypto_hdkey::KeyDescriptor;
pub use crypto_output::{OutputDescriptor, ScriptKind, sort_keys};
pub use crypto_seed::CryptoSeed;
pub use error::{Result, UrError};
pub use keypath::{Derivation, Keypath, Path};
pub use registry::{Artifact, parse};
