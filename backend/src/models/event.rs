use chrono::{DateTime, Utc};

crate::define_id_type!(i64, ScanEventId);

/// One tag read downloaded from a guard's reader.
///
/// `id` is `None` until the event is stored; the repository assigns it.
/// `processed` marks events already folded into rounds by the reconciliation
/// driver, so a crashed or repeated batch can be drained again safely.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScanEvent {
    pub id: Option<ScanEventId>,
    /// Normalized tag identifier (uppercase hex, no whitespace).
    pub tag: String,
    pub timestamp: DateTime<Utc>,
    /// Reader the event was downloaded from, when known.
    pub reader_id: Option<String>,
    /// Raw line as received from the reader, kept for auditing.
    pub raw_line: Option<String>,
    pub processed: bool,
}

impl ScanEvent {
    /// Unstored event with nothing but the identifying pair set.
    pub fn new(tag: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            tag: tag.into(),
            timestamp,
            reader_id: None,
            raw_line: None,
            processed: false,
        }
    }
}
