use crate::constants::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Whether the interstitial uses its built-in content or the user's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Default,
    Custom,
}

impl Mode {
    /// Only the literal string "custom" selects custom mode.
    fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("custom") => Mode::Custom,
            Some(_) | None => Mode::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Default => "default",
            Mode::Custom => "custom",
        }
    }
}

/// Cosmetic customization of the interstitial page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterstitialSettings {
    pub mode: Mode,
    pub message: String,
    pub background_mode: Mode,
    pub background_url: String,
    pub background_fit: String,
    /// Card opacity in percent, 0-100.
    pub card_opacity: i32,
    pub audio_mode: Mode,
    pub audio_url: String,
}

impl Default for InterstitialSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Default,
            message: String::new(),
            background_mode: Mode::Default,
            background_url: String::new(),
            background_fit: DEFAULT_BG_FIT.to_string(),
            card_opacity: DEFAULT_CARD_OPACITY,
            audio_mode: Mode::Default,
            audio_url: String::new(),
        }
    }
}

/// What the interstitial actually shows once settings are applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub custom_message: Option<String>,
    pub background_image: String,
    pub background_fit: String,
    pub card_alpha: f64,
    pub audio_embed_url: String,
}

fn string_field(value: Option<&Value>, fallback: &str) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or(fallback)
        .to_string()
}

fn opacity_field(value: Option<&Value>) -> i32 {
    value
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(DEFAULT_CARD_OPACITY)
}

impl InterstitialSettings {
    /// Build settings from keyed values, defaulting each field on its own
    /// when it is missing or has the wrong type.
    fn from_lookup<'a, F>(get: F, audio_url_fallback: &str) -> Self
    where
        F: Fn(&str) -> Option<&'a Value>,
    {
        Self {
            mode: Mode::from_value(get(MODE_KEY)),
            message: string_field(get(MESSAGE_KEY), ""),
            background_mode: Mode::from_value(get(BG_MODE_KEY)),
            background_url: string_field(get(BG_URL_KEY), ""),
            background_fit: string_field(get(BG_FIT_KEY), DEFAULT_BG_FIT),
            card_opacity: opacity_field(get(CARD_OPACITY_KEY)),
            audio_mode: Mode::from_value(get(AUDIO_MODE_KEY)),
            audio_url: string_field(get(AUDIO_URL_KEY), audio_url_fallback),
        }
    }

    /// Settings from persisted key/value pairs.
    pub fn from_stored(values: &[(&str, Option<Value>)]) -> Self {
        Self::from_lookup(
            |key| {
                values
                    .iter()
                    .find(|(k, _)| *k == key)
                    .and_then(|(_, v)| v.as_ref())
            },
            "",
        )
    }

    /// Settings from a live-preview payload sent by the options page.
    /// The payload uses camelCase field names instead of storage keys.
    pub fn from_preview(payload: &Value) -> Self {
        let field = |key: &str| {
            let name = match key {
                MODE_KEY => Some("mode"),
                MESSAGE_KEY => Some("message"),
                BG_MODE_KEY => Some("backgroundMode"),
                BG_URL_KEY => Some("backgroundUrl"),
                BG_FIT_KEY => Some("backgroundFit"),
                CARD_OPACITY_KEY => Some("cardOpacity"),
                AUDIO_MODE_KEY => Some("audioMode"),
                AUDIO_URL_KEY => Some("audioUrl"),
                _ => None,
            };
            name.and_then(|n| payload.get(n))
        };
        Self::from_lookup(field, DEFAULT_AUDIO_URL)
    }

    /// Storage key/value pairs, written together.
    pub fn to_stored(&self) -> Vec<(&'static str, Value)> {
        vec![
            (MODE_KEY, Value::from(self.mode.as_str())),
            (MESSAGE_KEY, Value::from(self.message.as_str())),
            (BG_MODE_KEY, Value::from(self.background_mode.as_str())),
            (BG_URL_KEY, Value::from(self.background_url.as_str())),
            (BG_FIT_KEY, Value::from(self.background_fit.as_str())),
            (CARD_OPACITY_KEY, Value::from(self.card_opacity)),
            (AUDIO_MODE_KEY, Value::from(self.audio_mode.as_str())),
            (AUDIO_URL_KEY, Value::from(self.audio_url.as_str())),
        ]
    }

    /// Resolve what the interstitial shows for these settings.
    pub fn resolve(&self) -> Presentation {
        let custom_message = match self.mode {
            Mode::Custom if self.message.is_empty() => Some(DEFAULT_MESSAGE.to_string()),
            Mode::Custom => Some(self.message.clone()),
            Mode::Default => None,
        };

        let background_image = match self.background_mode {
            Mode::Custom if !self.background_url.is_empty() => self.background_url.clone(),
            Mode::Custom | Mode::Default => DEFAULT_BG_URL.to_string(),
        };

        let background_fit = if self.background_fit.is_empty() {
            DEFAULT_BG_FIT.to_string()
        } else {
            self.background_fit.clone()
        };

        let audio_embed_url = match self.audio_mode {
            Mode::Custom if !self.audio_url.is_empty() => soundcloud_embed_url(&self.audio_url),
            Mode::Custom | Mode::Default => DEFAULT_AUDIO_EMBED.to_string(),
        };

        Presentation {
            custom_message,
            background_image,
            background_fit,
            card_alpha: f64::from(self.card_opacity) / 100.0,
            audio_embed_url,
        }
    }
}

/// SoundCloud widget URL for a track page URL.
pub fn soundcloud_embed_url(track_url: &str) -> String {
    let params = [
        ("url", track_url),
        ("color", "#597db5"),
        ("auto_play", "false"),
        ("hide_related", "false"),
        ("show_comments", "true"),
        ("show_user", "true"),
        ("show_reposts", "false"),
        ("show_teaser", "true"),
        ("visual", "true"),
    ];
    match Url::parse_with_params(SOUNDCLOUD_PLAYER_URL, &params) {
        Ok(url) => url.to_string(),
        Err(_) => DEFAULT_AUDIO_EMBED.to_string(),
    }
}
