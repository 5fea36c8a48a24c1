//! Payee cleaning for bank-imported transactions.
//!
//! Imported payees look like `8286 COGO ANTWERPEN Betaling met 123...`: a
//! terminal number, the merchant, then the card-payment boilerplate. Only the
//! merchant part is kept for display.

use std::sync::LazyLock;

use regex::Regex;

/// Boilerplate that starts the card-payment suffix.
pub const CARD_PAYMENT_MARKER: &str = "Betaling met";

// static pattern
#[allow(clippy::expect_used)]
static MERCHANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^[\d\s]*(.*?)(?:{}|\d)",
        regex::escape(CARD_PAYMENT_MARKER)
    ))
    .expect("static payee pattern is valid")
});

/// Return the display payee for a raw imported payee string.
///
/// Leading digits/whitespace are skipped and the text up to the card-payment
/// marker or the first digit is kept. Without such a boundary, or when
/// nothing is left before it, the trimmed input is returned unchanged.
pub fn clean_payee(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let cleaned = MERCHANT
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|merchant| merchant.as_str().trim())
        .filter(|merchant| !merchant.is_empty());

    match cleaned {
        Some(merchant) => merchant.to_string(),
        None => raw.trim().to_string(),
    }
}
