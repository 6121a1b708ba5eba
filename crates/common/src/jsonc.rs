// JSON-with-comments helpers.
//
// `strip_comments` blanks comments instead of removing them, so byte offsets
// into the stripped text are byte offsets into the original buffer.

use std::collections::HashSet;
use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

/// A `"key": "value"` member found in the text, with the value already
/// unescaped. `value_end` is the byte offset just past the closing quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringMember {
    pub key: String,
    pub value: String,
    pub value_start: usize,
    pub value_end: usize,
}

/// Replace `//` and `/* */` comments outside string literals with spaces.
/// Line breaks inside comments are kept; the output has the same byte length.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    let mut in_string = false;

    while let Some((_, ch)) = chars.next() {
        if in_string {
            out.push(ch);
            match ch {
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (ch, chars.peek().map(|(_, next)| *next)) {
            ('"', _) => {
                in_string = true;
                out.push(ch);
            }
            ('/', Some('/')) => {
                chars.next();
                out.push_str("  ");
                while let Some((_, next)) = chars.peek().copied() {
                    if next == '\n' || next == '\r' {
                        break;
                    }
                    chars.next();
                    blank(&mut out, next);
                }
            }
            ('/', Some('*')) => {
                chars.next();
                out.push_str("  ");
                let mut previous = '\0';
                for (_, next) in chars.by_ref() {
                    blank(&mut out, next);
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

fn blank(out: &mut String, ch: char) {
    if ch == '\n' || ch == '\r' {
        out.push(ch);
    } else {
        out.extend(std::iter::repeat(' ').take(ch.len_utf8()));
    }
}

/// Strip comments and parse. Any parse error yields `None`.
pub fn parse_lenient(text: &str) -> Option<Value> {
    serde_json::from_str(&strip_comments(text)).ok()
}

/// True when some object in `text` repeats a key. Unparseable input is `false`.
///
/// Expects comment-free input; `serde_json::Value` keeps only the last of a
/// repeated key, so the parsed tree alone cannot tell.
pub fn has_duplicate_keys(text: &str) -> bool {
    serde_json::from_str::<DuplicateScan>(text).map(|scan| scan.0).unwrap_or(false)
}

struct DuplicateScan(bool);

impl<'de> Deserialize<'de> for DuplicateScan {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DuplicateVisitor)
    }
}

struct DuplicateVisitor;

impl<'de> Visitor<'de> for DuplicateVisitor {
    type Value = DuplicateScan;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E>(self, _: bool) -> Result<DuplicateScan, E> {
        Ok(DuplicateScan(false))
    }

    fn visit_i64<E>(self, _: i64) -> Result<DuplicateScan, E> {
        Ok(DuplicateScan(false))
    }

    fn visit_u64<E>(self, _: u64) -> Result<DuplicateScan, E> {
        Ok(DuplicateScan(false))
    }

    fn visit_f64<E>(self, _: f64) -> Result<DuplicateScan, E> {
        Ok(DuplicateScan(false))
    }

    fn visit_str<E>(self, _: &str) -> Result<DuplicateScan, E> {
        Ok(DuplicateScan(false))
    }

    fn visit_unit<E>(self) -> Result<DuplicateScan, E> {
        Ok(DuplicateScan(false))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<DuplicateScan, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut found = false;
        while let Some(DuplicateScan(nested)) = seq.next_element()? {
            found |= nested;
        }
        Ok(DuplicateScan(found))
    }

    fn visit_map<A>(self, mut map: A) -> Result<DuplicateScan, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut keys = HashSet::new();
        let mut found = false;
        while let Some(key) = map.next_key::<String>()? {
            found |= !keys.insert(key);
            let DuplicateScan(nested) = map.next_value()?;
            found |= nested;
        }
        Ok(DuplicateScan(found))
    }
}

/// Every `"key": "string"` member of `text`, in document order.
///
/// Expects comment-free input (see [`strip_comments`]); anything that does not
/// tokenize as a string literal is skipped over.
pub fn scan_string_members(text: &str) -> Vec<StringMember> {
    let bytes = text.as_bytes();
    let mut members = Vec::new();
    let mut pending_key: Option<(String, bool)> = None;
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'"' => {
                let Some(end) = string_end(bytes, index) else {
                    break;
                };
                let decoded = serde_json::from_str::<String>(&text[index..end]).ok();

                match (pending_key.take(), decoded) {
                    (Some((key, true)), Some(value)) => {
                        members.push(StringMember { key, value, value_start: index, value_end: end });
                    }
                    (_, Some(candidate)) => pending_key = Some((candidate, false)),
                    (_, None) => {}
                }
                index = end;
            }
            b':' => {
                pending_key = match pending_key.take() {
                    Some((key, false)) => Some((key, true)),
                    _ => None,
                };
                index += 1;
            }
            byte if byte.is_ascii_whitespace() => index += 1,
            _ => {
                pending_key = None;
                index += 1;
            }
        }
    }

    members
}

// Offset just past the closing quote of the literal starting at `start`.
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut index = start + 1;
    while index < bytes.len() {
        match bytes[index] {
            b'\\' => index += 2,
            b'"' => return Some(index + 1),
            _ => index += 1,
        }
    }
    None
}
