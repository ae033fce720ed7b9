//! Helpers shared by providers

/// Minimum key length to display partial key
const MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY: usize = 8;

/// Number of characters to show at start/end of masked key
const KEY_MASK_VISIBLE_CHARS: usize = 4;

/// Longest provider message passed through verbatim
const MAX_PASSTHROUGH_LEN: usize = 200;

/// Mask API key for safe display in logs
///
/// # Examples
/// ```
/// use coco_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-ant-1234567890abcdef"), "sk-a...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= MIN_KEY_LENGTH_FOR_PARTIAL_DISPLAY || !key.is_ascii() {
        return "****".to_string();
    }
    format!(
        "{}...{}",
        &key[..KEY_MASK_VISIBLE_CHARS],
        &key[key.len() - KEY_MASK_VISIBLE_CHARS..]
    )
}

/// Strip credentials and raw payloads from a provider error message
#[must_use]
pub fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("api-key")
        || lower.contains("apikey")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        return "API authentication error. Please check your API key configuration.".to_string();
    }

    if lower.contains("rate limit") || lower.contains("overloaded") || lower.contains("quota") {
        return "API rate limit exceeded. Please try again later.".to_string();
    }

    if error.chars().count() <= MAX_PASSTHROUGH_LEN {
        return error.to_string();
    }

    "An API error occurred. Please try again.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        let masked = mask_api_key("sk-ant-REDACTED");
        assert!(masked.starts_with("sk-a"));
        assert!(masked.contains("..."));
        assert!(!masked.contains("1234567890"));
    }

    #[test]
    fn test_sanitize_api_error() {
        let sanitized = sanitize_api_error("authentication_error: invalid x-api-key");
        assert!(!sanitized.contains("x-api-key"));
        assert!(sanitized.contains("authentication"));

        let sanitized = sanitize_api_error("overloaded_error: Overloaded");
        assert!(sanitized.contains("rate limit"));

        assert_eq!(sanitize_api_error("max_tokens: too large"), "max_tokens: too large");
        assert_eq!(
            sanitize_api_error(&"x".repeat(500)),
            "An API error occurred. Please try again."
        );
    }
}
