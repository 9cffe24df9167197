//! Barcode normalization and validation.
//!
//! Scanners and manual entry both hand us free-form strings. Everything that
//! is not an ASCII digit is dropped, and the remaining digit string must be
//! 8 to 14 digits long (UPC-E, EAN-8, UPC-A, EAN-13, GTIN-14).
use std::fmt;
use thiserror::Error;

pub const MIN_DIGITS: usize = 8;
pub const MAX_DIGITS: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid barcode {raw:?}: expected {MIN_DIGITS}-{MAX_DIGITS} digits, got {digits}")]
pub struct InvalidBarcode {
    pub raw: String,
    pub digits: usize,
}

/// A normalized barcode. Only constructible through [`Barcode::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barcode(String);

/// Strip every character that is not a decimal digit.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn is_valid(normalized: &str) -> bool {
    (MIN_DIGITS..=MAX_DIGITS).contains(&normalized.len())
        && normalized.bytes().all(|b| b.is_ascii_digit())
}

impl Barcode {
    pub fn parse(raw: &str) -> Result<Self, InvalidBarcode> {
        let digits = normalize(raw);
        if !is_valid(&digits) {
            return Err(InvalidBarcode {
                raw: raw.to_string(),
                digits: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// GTIN-13 form used by the nutrition provider: shorter codes are
    /// left-padded with zeros, 13 and 14 digit codes are returned as is.
    pub fn gtin13(&self) -> String {
        format!("{:0>13}", self.0)
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Barcode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
