//! Helpers for the BepInEx `.cfg` dialect: line-oriented `key = value`
//! entries under `[Section]` headers, `#`/`;` comments.

/// Extract `key = value` pairs, skipping blanks, comments and section
/// headers. Unknown keys are the caller's concern.
pub fn key_values(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            pairs.push((key.trim(), value.trim()));
        }
    }
    pairs
}

/// Booleans the plugins accept: true/1/yes/on, case-insensitive.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

pub fn parse_float(value: &str) -> f32 {
    value.parse().unwrap_or(0.0)
}

pub fn parse_int(value: &str, fallback: i32) -> i32 {
    value.parse().unwrap_or(fallback)
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_values_skips_comments_and_sections() {
        let content = "## created by plugin\n[General]\n\nEnable = true\n; note\nDensity = 80\n";
        let pairs = key_values(content);
        assert_eq!(pairs, vec![("Enable", "true"), ("Density", "80")]);
    }

    #[test]
    fn parse_bool_accepts_plugin_spellings() {
        for value in ["true", "True", "1", "yes", "ON"] {
            assert!(parse_bool(value), "{value} should parse as true");
        }
        for value in ["false", "0", "no", "off", "banana"] {
            assert!(!parse_bool(value), "{value} should parse as false");
        }
    }

    #[test]
    fn parse_int_falls_back_on_garbage() {
        assert_eq!(parse_int("42", 4), 42);
        assert_eq!(parse_int("not-a-number", 4), 4);
    }
}
