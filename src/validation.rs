use crate::constants::MAX_CARD_OPACITY;
use crate::error::AppError;
use crate::models::{InterstitialSettings, Mode};
use url::Url;

/// Normalize user input (bare host or full URL) into a bare hostname.
///
/// Returns an empty string when the input cannot be parsed.
pub fn normalize_domain(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_empty() {
        return String::new();
    }

    let parsed = if trimmed.contains("://") {
        Url::parse(&trimmed)
    } else {
        Url::parse(&format!("https://{trimmed}"))
    };

    match parsed {
        Ok(url) => url
            .host_str()
            .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Basic domain validation; accepts localhost for testing.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    if domain == "localhost" {
        return true;
    }
    domain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
        && domain.contains('.')
}

/// Trim, lowercase and collapse whitespace runs to a single space.
pub fn normalize_keyword(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keywords can be a single word or a phrase; empty is invalid.
pub fn is_valid_keyword(keyword: &str) -> bool {
    !keyword.is_empty()
}

/// Normalize and validate a domain. Returns the canonical hostname.
pub fn validate_domain(raw: &str) -> Result<String, AppError> {
    let domain = normalize_domain(raw);
    if !is_valid_domain(&domain) {
        return Err(AppError::InvalidInput {
            field: "domain",
            reason: "Enter a valid domain like example.com.".into(),
        });
    }
    Ok(domain)
}

/// Normalize and validate a keyword or phrase.
pub fn validate_keyword(raw: &str) -> Result<String, AppError> {
    let keyword = normalize_keyword(raw);
    if !is_valid_keyword(&keyword) {
        return Err(AppError::InvalidInput {
            field: "keyword",
            reason: "Enter a keyword or phrase.".into(),
        });
    }
    Ok(keyword)
}

/// Validate interstitial settings before saving.
/// Returns the settings with text fields trimmed.
pub fn validate_settings(settings: &InterstitialSettings) -> Result<InterstitialSettings, AppError> {
    let cleaned = InterstitialSettings {
        message: settings.message.trim().to_string(),
        background_url: settings.background_url.trim().to_string(),
        audio_url: settings.audio_url.trim().to_string(),
        ..settings.clone()
    };

    if cleaned.mode == Mode::Custom && cleaned.message.is_empty() {
        return Err(AppError::InvalidInput {
            field: "message",
            reason: "Enter a custom message or switch to default.".into(),
        });
    }
    if cleaned.background_mode == Mode::Custom && cleaned.background_url.is_empty() {
        return Err(AppError::InvalidInput {
            field: "background_url",
            reason: "Enter a background image URL or switch to default.".into(),
        });
    }
    if !(0..=MAX_CARD_OPACITY).contains(&cleaned.card_opacity) {
        return Err(AppError::InvalidInput {
            field: "card_opacity",
            reason: "Card transparency must be between 0% and 100%.".into(),
        });
    }
    if cleaned.audio_mode == Mode::Custom && cleaned.audio_url.is_empty() {
        return Err(AppError::InvalidInput {
            field: "audio_url",
            reason: "Enter a SoundCloud URL or switch to default.".into(),
        });
    }

    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain_full_url() {
        assert_eq!(normalize_domain("HTTPS://WWW.Example.com/path"), "example.com");
        assert_eq!(normalize_domain("http://news.ycombinator.com/item?id=1"), "news.ycombinator.com");
    }

    #[test]
    fn test_normalize_domain_bare_host() {
        assert_eq!(normalize_domain("  Reddit.com "), "reddit.com");
        assert_eq!(normalize_domain("www.reddit.com/r/rust"), "reddit.com");
        assert_eq!(normalize_domain("example.com:8080"), "example.com");
    }

    #[test]
    fn test_normalize_domain_unparseable() {
        assert_eq!(normalize_domain("not a url"), "");
        assert_eq!(normalize_domain(""), "");
        assert_eq!(normalize_domain("   "), "");
    }

    #[test]
    fn test_normalize_domain_is_idempotent() {
        for raw in ["example.com", "WWW.Sub.Example.org/x", "localhost", "a-b.co.uk"] {
            let once = normalize_domain(raw);
            assert_eq!(normalize_domain(&once), once);
        }
    }

    #[test]
    fn test_is_valid_domain() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("localhost"));
        assert!(is_valid_domain("a-b.example.co.uk"));
        assert!(!is_valid_domain("example"));
        assert!(!is_valid_domain(""));
        assert!(!is_valid_domain("exa mple.com"));
        assert!(!is_valid_domain("[::1]"));
    }

    #[test]
    fn test_normalize_keyword() {
        assert_eq!(normalize_keyword("  Foo   Bar "), "foo bar");
        assert_eq!(normalize_keyword("foo\t\nbar"), "foo bar");
        assert_eq!(normalize_keyword("   "), "");
        assert_eq!(normalize_keyword("foo bar"), "foo bar");
    }

    #[test]
    fn test_is_valid_keyword() {
        assert!(is_valid_keyword("x"));
        assert!(!is_valid_keyword(""));
    }

    #[test]
    fn test_validate_domain_error_message() {
        let err = validate_domain("example").unwrap_err();
        assert_eq!(err.status_text("add rule"), "Enter a valid domain like example.com.");
        assert_eq!(validate_domain("https://www.example.com").unwrap(), "example.com");
    }

    #[test]
    fn test_validate_keyword() {
        assert_eq!(validate_keyword(" Cute  Cats ").unwrap(), "cute cats");
        assert!(validate_keyword(" \t ").is_err());
    }

    #[test]
    fn test_validate_settings_custom_message_required() {
        let settings = InterstitialSettings {
            mode: Mode::Custom,
            message: "   ".into(),
            ..InterstitialSettings::default()
        };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_validate_settings_opacity_range() {
        let settings = InterstitialSettings { card_opacity: 101, ..InterstitialSettings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = InterstitialSettings { card_opacity: -1, ..InterstitialSettings::default() };
        assert!(validate_settings(&settings).is_err());

        let settings = InterstitialSettings { card_opacity: 0, ..InterstitialSettings::default() };
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_validate_settings_custom_urls_required() {
        let settings = InterstitialSettings {
            background_mode: Mode::Custom,
            ..InterstitialSettings::default()
        };
        assert!(validate_settings(&settings).is_err());

        let settings = InterstitialSettings {
            audio_mode: Mode::Custom,
            audio_url: " ".into(),
            ..InterstitialSettings::default()
        };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_validate_settings_trims() {
        let settings = InterstitialSettings {
            mode: Mode::Custom,
            message: "  Breathe.  ".into(),
            ..InterstitialSettings::default()
        };
        assert_eq!(validate_settings(&settings).unwrap().message, "Breathe.");
    }
}
