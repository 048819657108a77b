/// Database row types — these map directly to SQLite rows.
/// Distinct from pixelwall-types wire models to keep the DB layer independent.

pub struct IdentityRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub location: String,
    pub bio: String,
    pub avatar: Option<String>,
    pub last_login: Option<String>,
    pub created_at: String,
}

pub struct PublicMessageRow {
    pub id: i64,
    pub username: String,
    pub message: String,
    pub timestamp: String,
}

pub struct PrivateMessageRow {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub message: String,
    pub timestamp: String,
}

/// A reset token joined with the identity it belongs to.
pub struct ResetLookupRow {
    pub token_id: i64,
    pub username_id: i64,
    pub username: String,
}

/// Parse a stored timestamp. SQLite's `datetime('now')` writes
/// "YYYY-MM-DD HH:MM:SS" without a timezone, so try RFC 3339 first and fall
/// back to naive UTC.
pub fn parse_timestamp(raw: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::warn!("Corrupt stored timestamp '{}': {}", raw, e);
            chrono::DateTime::default()
        })
}
