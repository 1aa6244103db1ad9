use crate::validators::digits_only;
use serde::Serialize;
use std::fmt;

/// Card brand derived from the leading digits of a card number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CardBrand {
    Visa,
    Mastercard,
    Elo,
    #[serde(rename = "American Express")]
    AmericanExpress,
    Discover,
    Unknown,
}

impl CardBrand {
    /// Display name, also used as the stored `card_brand` column value.
    pub fn name(&self) -> &'static str {
        match self {
            CardBrand::Visa => "Visa",
            CardBrand::Mastercard => "Mastercard",
            CardBrand::Elo => "Elo",
            CardBrand::AmericanExpress => "American Express",
            CardBrand::Discover => "Discover",
            CardBrand::Unknown => "Unknown",
        }
    }

    /// Maps a card scheme as reported by a BIN lookup service.
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme.trim().to_ascii_lowercase().as_str() {
            "visa" => CardBrand::Visa,
            "mastercard" => CardBrand::Mastercard,
            "elo" => CardBrand::Elo,
            "amex" | "american express" | "americanexpress" => CardBrand::AmericanExpress,
            "discover" => CardBrand::Discover,
            _ => CardBrand::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        *self != CardBrand::Unknown
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a card number by prefix and range rules. First match wins:
///
/// 1. `4` → Visa
/// 2. `50`, or 4-digit prefix in 5600..=5899 → Elo
/// 3. 4-digit prefix in 5100..=5599 → Mastercard
/// 4. `34` / `37` → American Express
/// 5. `6` → Discover
pub fn classify_card(raw: &str) -> CardBrand {
    let digits = digits_only(raw);
    if digits.len() < 4 {
        return CardBrand::Unknown;
    }

    // Ranges compare numerically, never as strings
    let prefix4: u16 = match digits[..4].parse() {
        Ok(p) => p,
        Err(_) => return CardBrand::Unknown,
    };

    if digits.starts_with('4') {
        CardBrand::Visa
    } else if digits.starts_with("50") || (5600..=5899).contains(&prefix4) {
        CardBrand::Elo
    } else if (5100..=5599).contains(&prefix4) {
        CardBrand::Mastercard
    } else if digits.starts_with("34") || digits.starts_with("37") {
        CardBrand::AmericanExpress
    } else if digits.starts_with('6') {
        CardBrand::Discover
    } else {
        CardBrand::Unknown
    }
}

/// Masks a card number down to its last four digits, e.g. `**** 1111`.
pub fn mask_card_number(raw: &str) -> String {
    let digits = digits_only(raw);
    let last_four = &digits[digits.len().saturating_sub(4)..];
    format!("**** {}", last_four)
}

/// Leading digits sent to a BIN lookup service (6 to 8 digits).
pub fn bin_prefix(raw: &str) -> Option<String> {
    let digits = digits_only(raw);
    if digits.len() < 6 {
        return None;
    }
    Some(digits[..digits.len().min(8)].to_string())
}
