//! Checksum validators shared by the checkout pipeline and the utility endpoints.
//!
//! - CPF (Brazilian national ID) check-digit validation
//! - Luhn checksum for payment card numbers
//! - Card expiration (`MM/YY`) validation

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static EXPIRATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/(\d{2})$").expect("static expiration regex"));

/// Strips every non-digit character from the input.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Reason a CPF failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpfError {
    WrongLength,
    Degenerate,
    FirstCheckDigitMismatch,
    SecondCheckDigitMismatch,
}

impl CpfError {
    pub fn reason(&self) -> &'static str {
        match self {
            CpfError::WrongLength => "wrong length",
            CpfError::Degenerate => "degenerate",
            CpfError::FirstCheckDigitMismatch => "first check digit mismatch",
            CpfError::SecondCheckDigitMismatch => "second check digit mismatch",
        }
    }
}

impl fmt::Display for CpfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

impl std::error::Error for CpfError {}

/// Computes a CPF check digit from a weighted sum whose weights start at
/// `first_weight` and descend to 2.
fn cpf_check_digit(digits: &[u32], first_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .zip((2..=first_weight).rev())
        .map(|(d, w)| d * w)
        .sum();

    let digit = 11 - (sum % 11);
    if digit >= 10 {
        0
    } else {
        digit
    }
}

/// Validate a CPF (Brazilian national ID).
///
/// Formatting characters are ignored, so both `529.982.247-25` and
/// `52998224725` are accepted.
pub fn validate_cpf(raw: &str) -> Result<(), CpfError> {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 11 {
        return Err(CpfError::WrongLength);
    }

    if digits.iter().all(|d| *d == digits[0]) {
        return Err(CpfError::Degenerate);
    }

    let first = cpf_check_digit(&digits[..9], 10);
    if first != digits[9] {
        return Err(CpfError::FirstCheckDigitMismatch);
    }

    // Second digit is computed over the first nine plus the computed first digit
    let mut prefix = digits[..9].to_vec();
    prefix.push(first);
    let second = cpf_check_digit(&prefix, 11);
    if second != digits[10] {
        return Err(CpfError::SecondCheckDigitMismatch);
    }

    Ok(())
}

/// Luhn checksum over the digits of a card number.
///
/// Returns false when fewer than 12 digits remain after stripping separators.
pub fn luhn_valid(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 12 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                *d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Validate a card expiration in `MM/YY` form against `today`.
///
/// A card stays valid through the whole of its expiration month.
pub fn validate_expiration(raw: &str, today: NaiveDate) -> bool {
    let Some(caps) = EXPIRATION_RE.captures(raw.trim()) else {
        return false;
    };

    let (Ok(month), Ok(year)) = (caps[1].parse::<u32>(), caps[2].parse::<i32>()) else {
        return false;
    };

    if !(1..=12).contains(&month) {
        return false;
    }

    let year = 2000 + year;
    (year, month) >= (today.year(), today.month())
}
