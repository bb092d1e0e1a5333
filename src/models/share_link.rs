use chrono::{DateTime, Utc};

/// Token-addressed access to the expense collection.
#[derive(Debug, Clone)]
pub struct ShareLink {
    pub id: Option<i64>,
    pub token: String,
    pub label: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub revoked: bool,
}

impl ShareLink {
    pub fn new(token: String, label: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: None,
            token,
            label,
            created_at: Utc::now().to_rfc3339(),
            expires_at: expires_at.map(|t| t.to_rfc3339()),
            revoked: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match &self.expires_at {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                // An unreadable expiry is treated as already expired.
                .map_or(true, |t| t.with_timezone(&Utc) <= now),
            None => false,
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired(now)
    }
}
