/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Fractional sort key for segments, parts and part instances.
pub type Rank = f64;

/// Offsets and durations inside a part, in milliseconds.
pub type Millis = i64;
