//! Indonesian rupiah price strings.

use once_cell::sync::Lazy;
use regex::Regex;

/// A thousand-unit token not glued to another letter: `150rb`, `25 k`.
static THOUSAND_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^a-z])(?:k|rb|ribu)(?:$|[^a-z])")
        .expect("Failed to compile price unit regex")
});

/// Parses a free-form price into IDR.
///
/// Free entries and placeholders are 0. `jt`/`juta` multiplies by a million;
/// a standalone `k`/`rb`/`ribu` unit by a thousand. Every non-digit character,
/// decimal separators included, is dropped before multiplying, so `"1.2 jt"`
/// reads as 12 million.
pub fn parse_price_idr(input: &str) -> f64 {
    let t = input.trim().to_lowercase();
    let placeholder = matches!(t.as_str(), "" | "-" | "n/a" | "na");
    if placeholder || ["gratis", "free", "donasi"].iter().any(|w| t.contains(w)) {
        return 0.0;
    }
    let mult = if t.contains("jt") || t.contains("juta") {
        1_000_000.0
    } else if THOUSAND_UNIT.is_match(&t) {
        1_000.0
    } else {
        1.0
    };
    let digits: String = t.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0.0;
    }
    digits.parse::<f64>().map(|d| d * mult).unwrap_or(0.0)
}

/// `150000.0` → `"Rp150.000"`. Non-finite input gives an empty string.
pub fn format_price_idr(n: f64) -> String {
    if !n.is_finite() {
        return String::new();
    }
    let val = n.round() as i64;
    let digits = val.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if val < 0 { "-" } else { "" };
    format!("Rp{sign}{grouped}")
}

/// Label shown to users: the raw string when present, else the formatted
/// number, else `"-"`.
pub fn display_price(price_str: &str, price_num: f64) -> String {
    let s = price_str.trim();
    if !s.is_empty() {
        return s.to_string();
    }
    if price_num > 0.0 {
        let f = format_price_idr(price_num);
        if !f.is_empty() {
            return f;
        }
    }
    "-".to_string()
}
