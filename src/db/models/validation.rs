//! Validation for user-supplied names and colors.

use crate::error::{CoreError, CoreResult};

const MAX_NAME_LENGTH: usize = 100;
/// One tonne, in grams
pub const MAX_WEIGHT: i64 = 1_000_000_000;

pub fn validate_color(color: &str) -> CoreResult<()> {
    let Some(hex_part) = color.strip_prefix('#') else {
        return Err(CoreError::invalid("color must be hex (#RRGGBB)"));
    };

    if hex_part.len() != 6 && hex_part.len() != 8 {
        return Err(CoreError::invalid(
            "color must be hex (#RRGGBB or #RRGGBBAA)",
        ));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CoreError::invalid("color must be hex (#RRGGBB)"));
    }

    Ok(())
}

/// Trim and check a display name. Returns the trimmed name.
pub fn validate_name(name: &str, what: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid(format!("{what} name cannot be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::invalid(format!(
            "{what} name too long (max {MAX_NAME_LENGTH} chars)"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_weight(weight: i64) -> CoreResult<()> {
    if weight < 0 {
        return Err(CoreError::invalid("weight cannot be negative"));
    }
    if weight > MAX_WEIGHT {
        return Err(CoreError::invalid(format!(
            "weight too large (max {MAX_WEIGHT} g)"
        )));
    }
    Ok(())
}
