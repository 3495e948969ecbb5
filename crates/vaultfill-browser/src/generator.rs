use crate::{Error, Result};
use aws_lc_rs::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const DIGITS: &str = "0123456789";
pub const SYMBOLS: &str = "!@#$%^&*()_-+={}[]|:;<>,.?/~";

pub const MIN_LENGTH: usize = 8;
pub const MAX_LENGTH: usize = 32;
pub const DEFAULT_LENGTH: usize = 16;

/// Character classes and length of a generated password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PasswordOptions {
    pub length: usize,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for PasswordOptions {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            uppercase: true,
            lowercase: true,
            digits: true,
            symbols: true,
        }
    }
}

impl PasswordOptions {
    pub fn clamped_length(&self) -> usize {
        self.length.clamp(MIN_LENGTH, MAX_LENGTH)
    }

    /// Concatenated alphabet of the selected classes
    pub fn charset(&self) -> Result<Vec<u8>> {
        let charset: Vec<u8> = [
            (self.uppercase, UPPERCASE),
            (self.lowercase, LOWERCASE),
            (self.digits, DIGITS),
            (self.symbols, SYMBOLS),
        ]
        .into_iter()
        .filter(|(selected, _)| *selected)
        .flat_map(|(_, class)| class.bytes())
        .collect();

        if charset.is_empty() {
            return Err(Error::InvalidOptions(
                "select at least one character type".to_string(),
            ));
        }
        Ok(charset)
    }
}

/// Password generator drawing from the OS random source
pub struct PasswordGenerator {
    rng: SystemRandom,
}

impl PasswordGenerator {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    pub fn generate(&self, options: &PasswordOptions) -> Result<String> {
        let charset = options.charset()?;
        let length = options.clamped_length();

        // Bytes at or above the largest multiple of the alphabet size are
        // rejected so every character is equally likely
        let limit = 256 - (256 % charset.len());

        let mut password = String::with_capacity(length);
        let mut buf = [0u8; 64];
        while password.len() < length {
            self.rng.fill(&mut buf).map_err(|_| Error::Random)?;

            for byte in buf.iter().map(|&b| b as usize).filter(|&b| b < limit) {
                password.push(charset[byte % charset.len()] as char);
                if password.len() == length {
                    break;
                }
            }
        }

        tracing::debug!("Generated a {} character password", length);
        Ok(password)
    }
}

impl Default for PasswordGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_password() {
        let password = PasswordGenerator::new()
            .generate(&PasswordOptions::default())
            .unwrap();
        assert_eq!(password.len(), DEFAULT_LENGTH);
        assert!(password.bytes().all(|b| b.is_ascii_graphic()));
    }

    #[test]
    fn test_length_is_clamped() {
        let generator = PasswordGenerator::new();
        for (requested, expected) in [(0, 8), (4, 8), (20, 20), (100, 32)] {
            let options = PasswordOptions {
                length: requested,
                ..Default::default()
            };
            assert_eq!(generator.generate(&options).unwrap().len(), expected);
        }
    }

    #[test]
    fn test_only_selected_classes() {
        let options = PasswordOptions {
            length: 32,
            uppercase: false,
            lowercase: false,
            digits: true,
            symbols: false,
        };
        let password = PasswordGenerator::new().generate(&options).unwrap();
        assert!(password.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_no_class_selected() {
        let options = PasswordOptions {
            uppercase: false,
            lowercase: false,
            digits: false,
            symbols: false,
            ..Default::default()
        };
        assert!(matches!(
            PasswordGenerator::new().generate(&options),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_charset_size() {
        assert_eq!(PasswordOptions::default().charset().unwrap().len(), 90);
    }

    #[test]
    fn test_options_from_json() {
        let options: PasswordOptions = serde_json::from_str(r#"{"length": 12, "symbols": false}"#).unwrap();
        assert_eq!(options.length, 12);
        assert!(!options.symbols);
        assert!(options.uppercase);
    }
}
