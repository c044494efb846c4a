//! S98 v3 tag block

use std::collections::BTreeMap;

/// Tag identifier
const TAG_MAGIC: &[u8; 5] = b"[S98]";

/// UTF-8 byte order mark
const UTF8_BOM: &[u8; 3] = b"\xEF\xBB\xBF";

/// Generate a tag block carrying the song title
pub fn generate_tag(title: &str) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(TAG_MAGIC);
    data.extend_from_slice(UTF8_BOM);
    data.extend_from_slice(b"title=");
    data.extend_from_slice(title.as_bytes());
    data.push(b'\n');
    data.push(0);
    data
}

/// Parse a tag block into `key=value` fields
pub fn parse_tag(data: &[u8]) -> Option<BTreeMap<String, String>> {
    let body = data.strip_prefix(TAG_MAGIC.as_slice())?;
    let body = body.strip_prefix(UTF8_BOM.as_slice()).unwrap_or(body);
    let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
    let text = String::from_utf8_lossy(&body[..end]);

    let fields = text
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    Some(fields)
}
