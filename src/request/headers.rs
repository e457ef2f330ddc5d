//! Response header views: ordered raw lines plus a case-insensitive,
//! multi-valued lookup map.

use std::collections::BTreeMap;

/// Headers of the final response of one attempt.
///
/// When the header text contains several header blocks (interim `100
/// Continue` responses or followed redirects), only the last block is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    lines: Vec<String>,
    map: BTreeMap<String, Vec<String>>,
}

impl ResponseHeaders {
    /// Parses raw header text (`\r\n` or `\n` separated).
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut headers = Self::default();
        for raw_line in text.lines() {
            let line = raw_line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with("HTTP/") {
                // Status line opens a new block.
                headers.lines.clear();
                headers.map.clear();
                headers.lines.push(line.to_string());
                continue;
            }
            headers.lines.push(line.to_string());
            if let Some((name, value)) = line.split_once(':') {
                headers
                    .map
                    .entry(name.trim().to_ascii_lowercase())
                    .or_default()
                    .push(value.trim().to_string());
            }
        }
        headers
    }

    /// Raw header lines in arrival order, status line included.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// First value of a header, case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// Every value of a header, case-insensitively; repeated names collapse
    /// into one list.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.map
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Lower-cased header names mapped to their values.
    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.map
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
