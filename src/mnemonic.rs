//! Mnemonic parsing from free-form text.

use bip39::{Error, Language, Mnemonic};

/// Parse whitespace-separated mnemonic words in any case, matched exactly
/// against the English word list.
pub trait ParseMnemonic {
    fn parse_mnemonic(&self) -> Result<Mnemonic, Error>;
}

impl ParseMnemonic for &str {
    fn parse_mnemonic(&self) -> Result<Mnemonic, Error> {
        let phrase = self
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect::<Vec<String>>()
            .join(" ");

        Mnemonic::parse_in(Language::English, &phrase)
    }
}

impl ParseMnemonic for String {
    fn parse_mnemonic(&self) -> Result<Mnemonic, Error> {
        self.as_str().parse_mnemonic()
    }
}
