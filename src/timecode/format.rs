use super::{Framerate, Result, Timecode, TimecodeError};
use std::fmt;

/// Shown in place of a timecode when none is available.
pub const INVALID_TIMECODE_STRING: &str = "-:--:--";

impl Timecode {
    /// `H:MM:SS:FF`, with `;` as the last separator for drop-frame rates.
    pub fn string_representation(&self) -> String {
        let sign = if self.negative { "-" } else { "" };
        let frame_separator = if self.framerate.is_drop_frame() { ';' } else { ':' };
        format!(
            "{}{}:{:02}:{:02}{}{:02}",
            sign, self.hh, self.mm, self.ss, frame_separator, self.ff
        )
    }

    /// `H:MM:SS:FF/BITS`
    pub fn string_representation_with_bits(&self) -> String {
        format!("{}/{:02}", self.string_representation(), self.bits)
    }

    /// `H:MM:SS:FF/BITS@RATE`, e.g. `1:02:24:15/64@29.97nd`.
    pub fn string_representation_with_bits_and_framerate(&self) -> String {
        format!("{}@{}", self.string_representation_with_bits(), self.framerate)
    }

    /// Parses `text` at `framerate`; see [`Timecode::set_string_representation`].
    pub fn from_string(framerate: Framerate, text: &str) -> Result<Self> {
        let mut tc = Timecode::zero(framerate);
        tc.set_string_representation(text)?;
        Ok(tc)
    }

    /// Sets the value from a string, starting with hours.
    ///
    /// Fields are separated by any non-numeric character and two consecutive
    /// separators stand around a zero, so `1.2..15` is `1:02:00:15`. A fifth
    /// field is read as bits. A trailing `@RATE` replaces the framerate; a
    /// leading `-` marks the value negative.
    pub fn set_string_representation(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        let (body, framerate) = match text.split_once('@') {
            Some((body, rate)) => (body, rate.parse::<Framerate>()?),
            None => (text, self.framerate),
        };
        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body),
        };

        let fields = split_fields(body).ok_or_else(|| TimecodeError::Parse(text.to_string()))?;
        if fields.is_empty() || fields.len() > 5 {
            return Err(TimecodeError::Parse(text.to_string()));
        }

        let field = |i: usize| fields.get(i).copied().unwrap_or(0);
        self.framerate = framerate;
        self.set_digits(field(0), field(1), field(2), field(3), field(4), negative);
        Ok(())
    }
}

/// Splits `body` into numeric fields; None if a field exceeds `u32::MAX`.
fn split_fields(body: &str) -> Option<Vec<i64>> {
    let mut fields = Vec::new();
    let mut current: Option<i64> = None;
    for ch in body.chars() {
        match ch.to_digit(10) {
            Some(digit) => {
                let value = current.unwrap_or(0).checked_mul(10)?.checked_add(digit as i64)?;
                if value > i64::from(u32::MAX) {
                    return None;
                }
                current = Some(value);
            }
            None => fields.push(current.take().unwrap_or(0)),
        }
    }
    if let Some(value) = current {
        fields.push(value);
    }
    Some(fields)
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_representation())
    }
}
