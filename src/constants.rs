// src/constants.rs

/// First rule id handed out; ids below this are never assigned
pub const RULE_ID_START: i64 = 1000;

/// Largest id the browser's matcher accepts (a 32-bit signed integer)
pub const MAX_RULE_ID: i64 = 2_147_483_647;

/// Priority given to every compiled redirect rule
pub const RULE_PRIORITY: u32 = 1;

/// Extension page matching navigations are redirected to
pub const INTERSTITIAL_PATH: &str = "/emergency.html";

/// The only resource type rules apply to (top-level navigations)
pub const MAIN_FRAME: &str = "main_frame";

/// Regex fragment matching one or more URL-encoded spaces ("+" or "%20")
pub const ENCODED_GAP: &str = r"(?:\+|%20)+";

/// Search engines keyword rules are restricted to.
pub const SEARCH_DOMAINS: &[&str] = &[
    "google.com",
    "bing.com",
    "duckduckgo.com",
    "yahoo.com",
    "yandex.com",
    "search.brave.com",
    "startpage.com",
];

// Storage keys
pub const ENTRIES_KEY: &str = "blacklistEntries";
pub const NEXT_ID_KEY: &str = "nextRuleId";
pub const CATALOG_KEY: &str = "defaultSeedList";
pub const MODE_KEY: &str = "emergencyMode";
pub const MESSAGE_KEY: &str = "customEmergencyMessage";
pub const BG_MODE_KEY: &str = "emergencyBackgroundMode";
pub const BG_URL_KEY: &str = "emergencyBackgroundUrl";
pub const BG_FIT_KEY: &str = "emergencyBackgroundFit";
pub const CARD_OPACITY_KEY: &str = "emergencyCardOpacity";
pub const AUDIO_MODE_KEY: &str = "emergencyAudioMode";
pub const AUDIO_URL_KEY: &str = "emergencyAudioUrl";

/// Interstitial defaults
pub const DEFAULT_MESSAGE: &str = "Take a moment to pause and choose a better path.";
pub const DEFAULT_BG_FIT: &str = "cover";
pub const DEFAULT_CARD_OPACITY: i32 = 40;
pub const MAX_CARD_OPACITY: i32 = 100;
pub const DEFAULT_BG_URL: &str = "https://images.unsplash.com/photo-1485470733090-0aae1788d5af?q=80&w=1217&auto=format&fit=crop&ixlib=rb-4.1.0&ixid=M3wxMjA3fDB8MHxwaG90by1wYWdlfHx8fGVufDB8fHx8fA%3D%3D";
pub const DEFAULT_AUDIO_URL: &str = "https://soundcloud.com/danielmp3-music/gods-creation";
pub const DEFAULT_AUDIO_EMBED: &str = "https://w.soundcloud.com/player/?url=https%3A//api.soundcloud.com/tracks/soundcloud%253Atracks%253A1308570070&color=%23597db5&auto_play=false&hide_related=false&show_comments=true&show_user=true&show_reposts=false&show_teaser=true&visual=true";
pub const SOUNDCLOUD_PLAYER_URL: &str = "https://w.soundcloud.com/player/";

/// Maximum number of rules the exported rule set may hold
pub const MAX_RULES: usize = 30_000;

/// Maximum number of regex rules the exported rule set may hold
pub const MAX_REGEX_RULES: usize = 1_000;

/// Chrome limits native messaging to 1MB (1024 * 1024 bytes)
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Built-in default catalog, persisted on first run.
pub const DEFAULT_DOMAINS: &[&str] = &[
    "pornhub.com",
    "xvideos.com",
    "xhamster.com",
    "xnxx.com",
    "youporn.com",
    "redtube.com",
    "tube8.com",
    "spankbang.com",
    "chaturbate.com",
    "livejasmin.com",
    "bongacams.com",
    "stripchat.com",
    "onlyfans.com",
    "manyvids.com",
    "adulttime.com",
    "brazzers.com",
    "bangbros.com",
    "naughtyamerica.com",
    "realitykings.com",
    "mofos.com",
    "porn.com",
    "porntube.com",
    "pornhd.com",
    "eporner.com",
    "thumbzilla.com",
    "tnaflix.com",
    "nudevista.com",
    "fuq.com",
    "sunporno.com",
    "keezmovies.com",
    "pornhubpremium.com",
    "eroprofile.com",
    "literotica.com",
    "imagefap.com",
    "motherless.com",
    "4tube.com",
    "x-art.com",
    "porndoe.com",
    "hclips.com",
    "porn300.com",
];
