//! Wire record: the nine raw fields of one detection line
//!
//! ```text
//! x z y width length height pivot id confidence
//! ```
//!
//! Tokens are separated by exactly one ASCII space. Extra trailing tokens
//! (the detection source terminates each record with a space) are ignored.

use std::fmt;
use std::str::{FromStr, Split};

use crate::error::{DecodeError, Field};

/// One record exactly as it appears on the wire, before any axis remap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireRecord {
    pub x: f32,
    /// Second token; becomes the output z axis
    pub z: f32,
    /// Third token; becomes the output y axis
    pub y: f32,
    pub width: f32,
    pub length: f32,
    pub height: f32,
    /// Yaw in radians
    pub pivot: f32,
    pub id: i32,
    pub confidence: f32,
}

impl WireRecord {
    /// Parse a non-empty record line
    ///
    /// Every field is validated independently and the first failure aborts
    /// the whole record.
    pub fn parse(line: &str) -> Result<Self, DecodeError> {
        let mut tokens = Tokens::new(line);

        Ok(Self {
            x: tokens.finite(Field::X)?,
            z: tokens.finite(Field::Z)?,
            y: tokens.finite(Field::Y)?,
            width: tokens.finite(Field::Width)?,
            length: tokens.finite(Field::Length)?,
            height: tokens.finite(Field::Height)?,
            pivot: tokens.finite(Field::Pivot)?,
            id: tokens.integer(Field::Id)?,
            confidence: tokens.finite(Field::Confidence)?,
        })
    }
}

impl fmt::Display for WireRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {} {} {}",
            self.x,
            self.z,
            self.y,
            self.width,
            self.length,
            self.height,
            self.pivot,
            self.id,
            self.confidence
        )
    }
}

impl FromStr for WireRecord {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Strict single-space tokenizer
struct Tokens<'a> {
    inner: Split<'a, char>,
}

impl<'a> Tokens<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            inner: line.split(' '),
        }
    }

    fn next(&mut self, field: Field) -> Result<&'a str, DecodeError> {
        self.inner.next().ok_or_else(|| DecodeError::missing(field))
    }

    fn finite(&mut self, field: Field) -> Result<f32, DecodeError> {
        let raw = self.next(field)?;
        let value: f32 = raw
            .parse()
            .map_err(|_| DecodeError::malformed(field, raw))?;

        if !value.is_finite() {
            return Err(DecodeError::non_finite(field, raw));
        }
        Ok(value)
    }

    fn integer(&mut self, field: Field) -> Result<i32, DecodeError> {
        let raw = self.next(field)?;
        raw.parse().map_err(|_| DecodeError::malformed(field, raw))
    }
}
