/// Key-value table backing the extension-style storage area.
/// Values are JSON documents.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Bumped whenever SCHEMA changes shape.
pub const SCHEMA_VERSION: i32 = 1;
