//! Data-interchange core for a Bitcoin hardware-wallet controller.
//!
//! Translates between compact on-the-wire representations (SeedQR images,
//! animated UR fragments) and structured wallet artifacts (BIP-39 seeds,
//! BIP-32 extended keys, output descriptors).

pub mod logging;
pub mod mnemonic;
pub mod scan;
pub mod seed_qr;

pub use graver_fountain as fountain;
pub use graver_ur as ur;
