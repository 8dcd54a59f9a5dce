//! JSON snapshot rendering.
//!
//! The snapshot is a single array of objects, one per kept record, with
//! every key of [`FIELDNAMES`](crate::models::FIELDNAMES) present (`null`
//! where a value is missing):
//!
//! ```text
//! [
//!   {
//!     "name": "The Example Times",
//!     "url": "https://mediabiasfactcheck.com/example-times/",
//!     "category": "Left",
//!     "source_url": null,
//!     "bias_rating": "LEFT",
//!     "bias_score": -5.3,
//!     ...
//!   }
//! ]
//! ```
//!
//! Output is UTF-8 with non-ASCII characters written literally, two-space
//! indentation, and no trailing newline.

use crate::models::SourceRecord;

/// Render records as a pretty-printed JSON array.
pub fn render_records<'a, I>(records: I) -> Result<Vec<u8>, serde_json::Error>
where
    I: IntoIterator<Item = &'a SourceRecord>,
{
    let records: Vec<&SourceRecord> = records.into_iter().collect();
    serde_json::to_vec_pretty(&records)
}

/// Parse a JSON snapshot back into records.
pub fn parse_records(json: &str) -> Result<Vec<SourceRecord>, serde_json::Error> {
    serde_json::from_str(json)
}
