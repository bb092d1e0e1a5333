/// Tracking record for an uploaded receipt that is not attached to an expense yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReceipt {
    pub id: Option<i64>,
    /// Form session that owns the upload. At most one record per session.
    pub session_id: String,
    pub object_key: String,
    pub file_name: String,
    pub created_at: String,
}

impl PendingReceipt {
    pub fn new(session_id: String, object_key: String, file_name: String) -> Self {
        Self {
            id: None,
            session_id,
            object_key,
            file_name,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Age relative to `now`, `None` when `created_at` cannot be parsed.
    pub fn age(&self, now: chrono::DateTime<chrono::Utc>) -> Option<chrono::Duration> {
        chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|created| now.signed_duration_since(created.with_timezone(&chrono::Utc)))
    }
}
