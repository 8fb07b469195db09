use crate::domain::entities::month::{MONTH_FORMAT_HINT, Month};

use super::app_error::FieldErrors;

pub const MAX_NAME_LEN: usize = 255;

/// Trims surrounding whitespace and checks 1..=255 characters.
pub fn normalize_name(name: &str) -> Option<String> {
    let name = name.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return None;
    }
    Some(name.to_string())
}

pub fn is_valid_price(price: i64) -> bool {
    price >= 0
}

/// Parses a month field, reporting a format failure against `field`.
pub fn parse_month_field(field: &str, raw: &str, errors: &mut FieldErrors) -> Option<Month> {
    match Month::parse(raw) {
        Ok(month) => Some(month),
        Err(_) => {
            errors.add(field, format!("expected {MONTH_FORMAT_HINT}"));
            None
        }
    }
}
