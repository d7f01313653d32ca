/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a random identifier for a combination record.
///
/// Generation emits thousands of records per millisecond on large trees,
/// so a v4 UUID is used instead of a time-based id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
