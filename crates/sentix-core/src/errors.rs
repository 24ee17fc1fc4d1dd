/// Fallback shown when an error carries no text at all.
pub const GENERIC_FAILURE: &str = "Something went wrong.";
pub const NETWORK_FAILURE: &str = "Network issue while contacting the API.";

/// Map raw transcript/backend failure text to a message a user can act on.
///
/// Matching is case-insensitive and ordered; unrecognised text is returned as-is.
pub fn friendly_error(raw: &str) -> String {
    let t = raw.to_lowercase();
    let hit = |needles: &[&str]| needles.iter().any(|n| t.contains(n));
    if hit(&["429", "rate"]) {
        "YouTube timedtext rate-limited (429). Try again later or use Whisper.".to_string()
    } else if hit(&["no transcript found"]) {
        "No CC/Whisper transcript available for this range.".to_string()
    } else if hit(&["quota"]) {
        "YouTube quota exceeded. Try later or adjust usage.".to_string()
    } else if hit(&["ffmpeg"]) {
        "ffmpeg is missing or misconfigured on the backend.".to_string()
    } else if hit(&["network", "fetch", "aborted"]) {
        NETWORK_FAILURE.to_string()
    } else if raw.trim().is_empty() {
        GENERIC_FAILURE.to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paraphrases_known_failures() {
        assert!(friendly_error("HTTP 429 Too Many Requests").contains("rate-limited"));
        assert!(friendly_error("No transcript found for video").starts_with("No CC/Whisper"));
        assert!(friendly_error("quota exceeded").contains("quota"));
        assert!(friendly_error("FFmpeg not on PATH").starts_with("ffmpeg"));
        assert_eq!(
            friendly_error("request aborted"),
            "Network issue while contacting the API."
        );
    }

    #[test]
    fn passes_through_unknown_text() {
        assert_eq!(friendly_error("HTTP 500 boom"), "HTTP 500 boom");
        assert_eq!(friendly_error("  "), GENERIC_FAILURE);
    }
}
