use std::fmt::{Debug, Display};

use serde::Serialize;

use super::PaginationError;

/// A cursor as it appears in a response body.
///
/// Integer keys stay JSON numbers so existing clients keep working, every
/// other key shape is emitted as its encoded string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cursor {
    Number(i64),
    Text(String),
}

/// An order key that can travel through a URL as an opaque cursor.
///
/// `decode(encode(k)) == k` must hold for every valid key.
pub trait CursorKey: Clone + Ord + Debug + Send + Sync + Sized {
    fn encode(&self) -> String;

    fn decode(raw: &str) -> Result<Self, PaginationError>;

    fn to_cursor(&self) -> Cursor {
        Cursor::Text(self.encode())
    }
}

/// One column of a composite key.
pub trait KeyComponent: Clone + Ord + Debug + Display + Send + Sync + Sized {
    fn parse_component(raw: &str) -> Option<Self>;
}

const COMPONENT_SEPARATOR: char = '_';

fn malformed(raw: &str, reason: impl Into<String>) -> PaginationError {
    PaginationError::MalformedCursor {
        cursor: raw.to_string(),
        reason: reason.into(),
    }
}

impl KeyComponent for i64 {
    fn parse_component(raw: &str) -> Option<Self> {
        raw.parse::<i64>().ok().filter(|v| *v >= 0)
    }
}

impl KeyComponent for String {
    fn parse_component(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.contains(COMPONENT_SEPARATOR) {
            return None;
        }
        Some(raw.to_string())
    }
}

impl CursorKey for i64 {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Result<Self, PaginationError> {
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| malformed(raw, "\"cursor\" must be an integer."))?;
        if value < 0 {
            return Err(malformed(raw, "\"cursor\" must be a non-negative integer."));
        }
        Ok(value)
    }

    fn to_cursor(&self) -> Cursor {
        Cursor::Number(*self)
    }
}

impl CursorKey for String {
    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(raw: &str) -> Result<Self, PaginationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(malformed(raw, "cursor is empty"));
        }
        Ok(raw.to_string())
    }
}

impl<A: KeyComponent, B: KeyComponent> CursorKey for (A, B) {
    fn encode(&self) -> String {
        format!("{}{COMPONENT_SEPARATOR}{}", self.0, self.1)
    }

    fn decode(raw: &str) -> Result<Self, PaginationError> {
        let parts: Vec<&str> = raw.trim().split(COMPONENT_SEPARATOR).collect();
        let [first, second] = parts.as_slice() else {
            return Err(malformed(
                raw,
                format!("expected 2 components separated by '{COMPONENT_SEPARATOR}'"),
            ));
        };
        let first = A::parse_component(first)
            .ok_or_else(|| malformed(raw, format!("invalid first component {first:?}")))?;
        let second = B::parse_component(second)
            .ok_or_else(|| malformed(raw, format!("invalid second component {second:?}")))?;
        Ok((first, second))
    }
}
