//! Accent color handling for the entry point.

use crate::error::{Result, ScaffoldError};

/// Reduction applied to the accent color for hover states.
pub const HOVER_DARKEN_PERCENT: u8 = 20;

/// Parses `#RGB` or `#RRGGBB` (leading `#` optional) into channels.
///
/// # Errors
/// Returns a configuration error for anything else.
pub fn parse_hex(color: &str) -> Result<[u8; 3]> {
    let digits = color.trim().trim_start_matches('#');
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Err(invalid(color)),
    };
    if !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(color));
    }

    let channel = |i: usize| {
        expanded
            .get(i..i.saturating_add(2))
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .ok_or_else(|| invalid(color))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

fn invalid(color: &str) -> ScaffoldError {
    ScaffoldError::configuration(format!(
        "Invalid color '{}': expected #RGB or #RRGGBB",
        color
    ))
}

/// Darkens each channel by `percent`, truncating toward zero.
///
/// The result is always `#RRGGBB` in upper case.
///
/// ```rust
/// use dbscaffold_core::generator::color::darken;
///
/// assert_eq!(darken("#FFFFFF", 20).unwrap(), "#CCCCCC");
/// assert_eq!(darken("#fd7e14", 20).unwrap(), "#CA6410");
/// ```
///
/// # Errors
/// Returns a configuration error if `color` is not a hex color.
pub fn darken(color: &str, percent: u8) -> Result<String> {
    let percent = u32::from(percent.min(100));
    let [r, g, b] = parse_hex(color)?.map(|c| {
        let scaled = u32::from(c) * (100 - percent) / 100;
        u8::try_from(scaled.min(255)).unwrap_or(u8::MAX)
    });
    Ok(format!("#{:02X}{:02X}{:02X}", r, g, b))
}

/// Normalizes a color to `#RRGGBB` in upper case.
///
/// # Errors
/// Returns a configuration error if `color` is not a hex color.
pub fn normalize(color: &str) -> Result<String> {
    darken(color, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_values() {
        assert_eq!(darken("#FFFFFF", 20).unwrap(), "#CCCCCC");
        assert_eq!(darken("#000000", 20).unwrap(), "#000000");
        assert_eq!(darken("#000", 75).unwrap(), "#000000");
        assert_eq!(darken("#fff", 20).unwrap(), "#CCCCCC");
        assert_eq!(darken("fd7e14", 20).unwrap(), "#CA6410");
        assert_eq!(darken("#123456", 100).unwrap(), "#000000");
        assert_eq!(darken("#123456", 0).unwrap(), "#123456");
    }

    #[test]
    fn test_invalid_colors() {
        for bad in ["", "#", "#12", "#12345", "#GGGGGG", "red", "#1234567"] {
            assert!(darken(bad, 20).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("#abc").unwrap(), "#AABBCC");
    }

    proptest! {
        #[test]
        fn prop_always_six_hex_digits(r: u8, g: u8, b: u8, percent in 0u8..=100, short: bool) {
            let input = if short {
                format!("#{:X}{:X}{:X}", r >> 4, g >> 4, b >> 4)
            } else {
                format!("#{:02x}{:02x}{:02x}", r, g, b)
            };
            let out = darken(&input, percent).unwrap();
            prop_assert_eq!(out.len(), 7);
            prop_assert!(out.starts_with('#'));
            prop_assert!(out[1..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }

        #[test]
        fn prop_never_brighter(r: u8, g: u8, b: u8, percent in 0u8..=100) {
            let input = format!("#{:02X}{:02X}{:02X}", r, g, b);
            let [dr, dg, db] = parse_hex(&darken(&input, percent).unwrap()).unwrap();
            prop_assert!(dr <= r && dg <= g && db <= b);
        }

        #[test]
        fn prop_black_stays_black(percent: u8) {
            prop_assert_eq!(darken("#000000", percent).unwrap(), "#000000");
        }
    }
}
