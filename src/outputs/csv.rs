//! CSV snapshot rendering.
//!
//! One header row with [`FIELDNAMES`] in order, then one row per record.
//! Missing values are empty cells; records end with CRLF.

use crate::models::{FIELDNAMES, SourceRecord};

/// Render records as CSV bytes.
pub fn render_records<'a, I>(records: I) -> Result<Vec<u8>, csv::Error>
where
    I: IntoIterator<Item = &'a SourceRecord>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(FIELDNAMES)?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_only_for_empty_set() {
        let out = render_records(std::iter::empty()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name,url,category,source_url,bias_rating,bias_score,factual_reporting,\
             factual_score,country,freedom_rating,media_type,traffic,credibility\r\n"
        );
    }

    #[test]
    fn test_rows_quote_and_blank() {
        let record = SourceRecord {
            name: "News, Inc.".to_string(),
            url: "https://mediabiasfactcheck.com/news-inc/".to_string(),
            category: "Right".to_string(),
            bias_rating: Some("RIGHT".to_string()),
            bias_score: Some(6.0),
            country: Some("USA".to_string()),
            ..Default::default()
        };
        let out = String::from_utf8(render_records([&record]).unwrap()).unwrap();
        let row = out.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "\"News, Inc.\",https://mediabiasfactcheck.com/news-inc/,Right,,RIGHT,6.0,,,USA,,,,"
        );
    }
}
