//! Header section storage and the line-oriented header parser.
//!
//! # Design Decisions
//! - One string value per name; repeated names are joined with `", "`.
//!   The join is lossy: the individual values are not recoverable.
//! - Entries keep insertion order so responses serialize deterministically.
//! - Lookups ignore ASCII case; parsed names are stored lower-cased.

use crate::http::error::ParseError;

/// Line terminator for every line in the header section.
pub const CRLF: &[u8] = b"\r\n";

const NAME_SEPARATOR: &[u8] = b": ";

/// Ordered, case-insensitive header map with join-on-append semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse at most one header line from the front of `data`.
    ///
    /// Returns `(consumed, done)`:
    /// - `(0, false)` when no complete line is buffered yet,
    /// - `(0, true)` when `data` starts with the blank line ending the section
    ///   (the caller consumes those two bytes),
    /// - `(line_len + 2, false)` after storing one header.
    pub fn parse(&mut self, data: &[u8]) -> Result<(usize, bool), ParseError> {
        let Some(line_end) = find_crlf(data) else {
            return Ok((0, false));
        };

        if line_end == 0 {
            return Ok((0, true));
        }

        let line = &data[..line_end];

        let Some(split) = find_separator(line) else {
            return Err(ParseError::MalformedHeader(String::from_utf8_lossy(line).into_owned()));
        };
        let (raw_name, raw_value) = (&line[..split], &line[split + NAME_SEPARATOR.len()..]);

        if raw_name.last().is_some_and(u8::is_ascii_whitespace) {
            return Err(ParseError::WhitespaceBeforeColon(String::from_utf8_lossy(line).into_owned()));
        }

        // Names are checked against the token set, which is pure ASCII. Values
        // may carry obs-text bytes and are stored lossily.
        let name = String::from_utf8_lossy(raw_name).trim().to_ascii_lowercase();
        if !is_valid_name(&name) {
            return Err(ParseError::InvalidHeaderName(name));
        }
        let raw_value = String::from_utf8_lossy(raw_value);

        self.append(&name, raw_value.trim());

        Ok((line_end + CRLF.len(), false))
    }

    /// Get the value stored for `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    /// Set `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Add `value` to `name`, joining with `", "` when the name already exists.
    pub fn append(&mut self, name: &str, value: &str) {
        match self.position(name) {
            Some(i) if !self.entries[i].1.is_empty() => {
                let existing = &mut self.entries[i].1;
                existing.push_str(", ");
                existing.push_str(value);
            }
            Some(i) => self.entries[i].1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    /// Remove `name`, returning its value if present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parsed `content-length` value.
    ///
    /// `Ok(None)` when the header is absent; a present but non-numeric value
    /// is an error.
    pub fn content_length(&self) -> Result<Option<usize>, ParseError> {
        match self.get("content-length") {
            None => Ok(None),
            Some(raw) => raw
                .parse::<usize>()
                .map(Some)
                .map_err(|_| ParseError::InvalidContentLength(raw.to_string())),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

/// Offset of the first `\r\n` in `data`.
pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF)
}

/// Offset of the first `": "` in a header line.
fn find_separator(line: &[u8]) -> Option<usize> {
    line.windows(NAME_SEPARATOR.len()).position(|w| w == NAME_SEPARATOR)
}

/// RFC 9110 token characters.
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_token_char)
}
