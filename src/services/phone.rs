use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CANONICAL_PHONE: Regex = Regex::new(r"^\+91\d{10}$").unwrap();
}

/// Canonicalize a phone number to `+91XXXXXXXXXX`.
///
/// Accepts the formats seen in historical consumer data: bare 10-digit
/// national numbers, numbers with a leading 0, `91`-prefixed numbers with
/// or without `+`, and any mix of spaces, hyphens and parentheses.
/// Returns `None` when the input cannot be reduced to a valid number.
pub fn normalize_phone(input: &str) -> Option<String> {
    if input.is_empty() {
        return None;
    }

    let mut phone: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if let Some(rest) = phone.strip_prefix('0') {
        phone = rest.to_string();
    }

    if phone.len() == 12 && phone.starts_with("91") && phone.chars().all(|c| c.is_ascii_digit()) {
        phone = format!("+{}", phone);
    }

    if phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit()) {
        phone = format!("+91{}", phone);
    }

    if !CANONICAL_PHONE.is_match(&phone) {
        return None;
    }

    Some(phone)
}

/// Last-10-digits fallback form, tolerating inconsistent stored formats.
pub fn last_ten_digits(input: &str) -> Option<String> {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 10 {
        return None;
    }
    Some(digits[digits.len() - 10..].to_string())
}

/// True when the input is made of nothing but digits and phone punctuation,
/// i.e. the caller meant it as a phone number rather than a meter id or email.
pub fn is_phone_shaped(input: &str) -> bool {
    !input.is_empty()
        && input
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'))
}

/// All normalized forms of a user-supplied identifier, computed once per
/// request and matched in a single OR-predicate query.
#[derive(Debug, Clone)]
pub struct IdentifierForms {
    pub upper: String,
    pub lower: String,
    pub canonical_phone: Option<String>,
    pub last10: Option<String>,
}

impl IdentifierForms {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            upper: trimmed.to_uppercase(),
            lower: trimmed.to_lowercase(),
            canonical_phone: normalize_phone(trimmed),
            last10: last_ten_digits(trimmed),
        }
    }
}
