use super::types::{
    MAX_DISPLAY_NAME_LENGTH, MAX_IDENTIFIER_LENGTH, MAX_LOBBY_PLAYERS, MAX_PROPERTY_KEY_LENGTH,
    MAX_PROPERTY_VALUE_LENGTH, MAX_SEARCH_RESULTS, MIN_LOBBY_PLAYERS, MIN_SEARCH_RESULTS,
};

/// Validate an opaque identifier (game id, session token, user-supplied id).
/// Identifiers are opaque strings, non-empty and bounded in length.
pub fn validate_identifier(label: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{label} cannot be empty"));
    }
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(format!(
            "{label} too long (max {MAX_IDENTIFIER_LENGTH} bytes)"
        ));
    }
    Ok(())
}

/// Sanitize a member display name: drop control characters except
/// tab/CR/LF, truncate to 64 characters, trim surrounding whitespace.
pub fn sanitize_display_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\r' | '\n'))
        .take(MAX_DISPLAY_NAME_LENGTH)
        .collect();
    cleaned.trim().to_string()
}

/// Truncate a property key to its maximum length and trim surrounding
/// whitespace. Keys keep their original case for display; comparisons
/// elsewhere are case-insensitive.
pub fn sanitize_property_key(raw: &str) -> String {
    let truncated: String = raw.chars().take(MAX_PROPERTY_KEY_LENGTH).collect();
    truncated.trim().to_string()
}

/// Truncate a property value to its maximum length.
pub fn sanitize_property_value(raw: &str) -> String {
    raw.chars().take(MAX_PROPERTY_VALUE_LENGTH).collect()
}

/// Clamp a requested player capacity into the supported range.
pub fn clamp_max_players(requested: u32) -> u8 {
    requested
        .clamp(u32::from(MIN_LOBBY_PLAYERS), u32::from(MAX_LOBBY_PLAYERS)) as u8
}

/// Clamp a search result limit into the supported range.
pub fn clamp_search_limit(requested: usize) -> usize {
    requested.clamp(MIN_SEARCH_RESULTS, MAX_SEARCH_RESULTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_rejects_empty_and_oversize() {
        assert!(validate_identifier("gameId", "").is_err());
        assert!(validate_identifier("gameId", &"g".repeat(129)).is_err());
        assert!(validate_identifier("gameId", &"g".repeat(128)).is_ok());
        assert!(validate_identifier("gameId", "11111111-1111-1111-1111-111111111111").is_ok());
    }

    #[test]
    fn display_name_is_trimmed_and_stripped() {
        assert_eq!(sanitize_display_name("  Ada  "), "Ada");
        assert_eq!(sanitize_display_name("A\u{0}d\u{7}a"), "Ada");
        // Tab, CR and LF survive inside the name
        assert_eq!(sanitize_display_name("A\tB"), "A\tB");
    }

    #[test]
    fn display_name_truncates_to_limit() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_display_name(&long).chars().count(), 64);
    }

    #[test]
    fn property_key_and_value_truncate() {
        assert_eq!(sanitize_property_key(&"k".repeat(100)).len(), 64);
        assert_eq!(sanitize_property_value(&"v".repeat(300)).len(), 256);
        assert_eq!(sanitize_property_key(" Mode "), "Mode");
    }

    #[test]
    fn max_players_clamps_at_both_ends() {
        assert_eq!(clamp_max_players(1), 2);
        assert_eq!(clamp_max_players(0), 2);
        assert_eq!(clamp_max_players(4), 4);
        assert_eq!(clamp_max_players(64), 64);
        assert_eq!(clamp_max_players(1000), 64);
    }

    #[test]
    fn search_limit_clamps_at_both_ends() {
        assert_eq!(clamp_search_limit(0), 1);
        assert_eq!(clamp_search_limit(50), 50);
        assert_eq!(clamp_search_limit(500), 100);
    }
}
