/// Job identifier. UUID v7, so ids sort by creation time.
pub type JobId = uuid::Uuid;

/// UTC timestamp used on jobs and events.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh job identifier.
pub fn new_job_id() -> JobId {
    uuid::Uuid::now_v7()
}
