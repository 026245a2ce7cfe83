//! SMPTE timecode values
//!
//! [`Timecode`] is a framerate-aware hh:mm:ss:ff value with sub-frame bits.
//! Every mutation ends with a rebalance, so the digits are always in range
//! for the current [`Framerate`]:
//! - hours wrap at 24
//! - minutes and seconds range over 0..60
//! - frames range over 0..fps, bits over 0..80
//! - with drop-frame counting, frames 0 and 1 are skipped at the start of
//!   every minute not divisible by ten
//!
//! Absolute arithmetic goes through the frame or bit count from 0:00:00:00.

mod format;
mod framerate;
mod mtc;

pub use format::INVALID_TIMECODE_STRING;
pub use framerate::Framerate;

use std::cmp::Ordering;
use thiserror::Error;

/// Sub-frame resolution, as in SMPTE linear timecode.
pub const BITS_PER_FRAME: i64 = 80;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimecodeError {
    /// Delta arithmetic between timecodes requires equal framerates.
    #[error("framerate mismatch: {left} vs {right}")]
    FramerateMismatch { left: Framerate, right: Framerate },
    #[error("cannot parse timecode from {0:?}")]
    Parse(String),
    #[error("unknown framerate {0:?}")]
    InvalidFramerate(String),
}

pub type Result<T> = std::result::Result<T, TimecodeError>;

#[derive(Debug, Clone, Copy)]
pub struct Timecode {
    hh: u32,
    mm: u32,
    ss: u32,
    ff: u32,
    bits: u32,
    framerate: Framerate,
    negative: bool,
}

impl Timecode {
    /// Creates a timecode from digits, which may be out of range; bits are zero.
    pub fn new(framerate: Framerate, hh: i64, mm: i64, ss: i64, ff: i64) -> Self {
        Self::with_bits(framerate, hh, mm, ss, ff, 0)
    }

    pub fn with_bits(framerate: Framerate, hh: i64, mm: i64, ss: i64, ff: i64, bits: i64) -> Self {
        let mut tc = Self::zero(framerate);
        tc.set_digits(hh, mm, ss, ff, bits, false);
        tc
    }

    pub fn zero(framerate: Framerate) -> Self {
        Self {
            hh: 0,
            mm: 0,
            ss: 0,
            ff: 0,
            bits: 0,
            framerate,
            negative: false,
        }
    }

    pub fn from_frames(framerate: Framerate, frames: i64) -> Self {
        let mut tc = Self::zero(framerate);
        tc.set_frames_from_zero(frames);
        tc
    }

    pub fn from_seconds(framerate: Framerate, seconds: f64) -> Self {
        let mut tc = Self::zero(framerate);
        tc.set_seconds_from_zero(seconds);
        tc
    }

    pub fn hh(&self) -> u32 {
        self.hh
    }

    pub fn mm(&self) -> u32 {
        self.mm
    }

    pub fn ss(&self) -> u32 {
        self.ss
    }

    pub fn ff(&self) -> u32 {
        self.ff
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn framerate(&self) -> Framerate {
        self.framerate
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn set_hh(&mut self, hh: i64) {
        self.set_digits(hh, self.mm.into(), self.ss.into(), self.ff.into(), self.bits.into(), self.negative);
    }

    pub fn set_mm(&mut self, mm: i64) {
        self.set_digits(self.hh.into(), mm, self.ss.into(), self.ff.into(), self.bits.into(), self.negative);
    }

    pub fn set_ss(&mut self, ss: i64) {
        self.set_digits(self.hh.into(), self.mm.into(), ss, self.ff.into(), self.bits.into(), self.negative);
    }

    pub fn set_ff(&mut self, ff: i64) {
        self.set_digits(self.hh.into(), self.mm.into(), self.ss.into(), ff, self.bits.into(), self.negative);
    }

    pub fn set_bits(&mut self, bits: i64) {
        self.set_digits(self.hh.into(), self.mm.into(), self.ss.into(), self.ff.into(), bits, self.negative);
    }

    pub fn set_negative(&mut self, negative: bool) {
        self.negative = negative;
        self.rebalance();
    }

    /// Reassigns the framerate without recalculating; the digits are
    /// reinterpreted at the new rate and rebalanced.
    pub fn set_framerate(&mut self, framerate: Framerate) {
        self.framerate = framerate;
        self.rebalance();
    }

    /// Brings every digit into range for the current framerate and applies the
    /// drop-frame skip.
    pub fn rebalance(&mut self) {
        self.set_digits(
            self.hh.into(),
            self.mm.into(),
            self.ss.into(),
            self.ff.into(),
            self.bits.into(),
            self.negative,
        );
    }

    /// Digit-level normalisation: carries at the nominal radix of each field.
    /// Summed in i128 so that any i64 field carries without overflow.
    fn set_digits(&mut self, hh: i64, mm: i64, ss: i64, ff: i64, bits: i64, negative: bool) {
        let fps = i128::from(self.framerate.fps());
        let bits_per_frame = i128::from(BITS_PER_FRAME);
        let mut total = (((i128::from(hh) * 60 + i128::from(mm)) * 60 + i128::from(ss)) * fps
            + i128::from(ff))
            * bits_per_frame
            + i128::from(bits);
        if negative {
            total = -total;
        }

        self.negative = total < 0;
        let mut rest = total.abs() % (24 * 3600 * fps * bits_per_frame);
        if rest == 0 {
            self.negative = false;
        }
        self.bits = (rest % bits_per_frame) as u32;
        rest /= bits_per_frame;
        self.ff = (rest % fps) as u32;
        rest /= fps;
        self.ss = (rest % 60) as u32;
        rest /= 60;
        self.mm = (rest % 60) as u32;
        rest /= 60;
        self.hh = rest as u32;

        self.skip_dropped_frames();
    }

    fn skip_dropped_frames(&mut self) {
        if self.framerate.is_drop_frame() && self.ss == 0 && self.ff < 2 && self.mm % 10 != 0 {
            self.ff = 2;
            self.bits = 0;
        }
    }

    /// Frames between 0:00:00:00 and this timecode, honouring drop-frame counting.
    pub fn frames_from_zero(&self) -> i64 {
        let fps = self.framerate.fps() as i64;
        let minutes = self.hh as i64 * 60 + self.mm as i64;
        let mut frames = (minutes * 60 + self.ss as i64) * fps + self.ff as i64;
        if self.framerate.is_drop_frame() {
            frames -= 2 * (minutes - minutes / 10);
        }
        if self.negative {
            -frames
        } else {
            frames
        }
    }

    /// Sets the timecode from a frame count; bits are cleared.
    pub fn set_frames_from_zero(&mut self, frames: i64) {
        self.set_bits_from_zero(frames.saturating_mul(BITS_PER_FRAME));
    }

    fn bits_from_zero(&self) -> i64 {
        let frames = self.frames_from_zero();
        if self.negative {
            frames * BITS_PER_FRAME - self.bits as i64
        } else {
            frames * BITS_PER_FRAME + self.bits as i64
        }
    }

    fn set_bits_from_zero(&mut self, total_bits: i64) {
        let fps = self.framerate.fps() as i64;
        self.negative = total_bits < 0;
        let magnitude = total_bits.unsigned_abs();
        let bits_per_frame = BITS_PER_FRAME as u64;
        self.bits = (magnitude % bits_per_frame) as u32;
        let frames =
            ((magnitude / bits_per_frame) % self.framerate.frames_per_day() as u64) as i64;

        // Map the real frame count onto the digit count by re-inserting the
        // numbers skipped at each non-tenth minute.
        let digit_frames = if self.framerate.is_drop_frame() {
            let per_ten_minutes = 17_982;
            let per_minute = 1_798;
            let tens = frames / per_ten_minutes;
            let rest = frames % per_ten_minutes;
            let skipped = if rest < 2 {
                18 * tens
            } else {
                18 * tens + 2 * ((rest - 2) / per_minute)
            };
            frames + skipped
        } else {
            frames
        };

        self.ff = (digit_frames % fps) as u32;
        let seconds = digit_frames / fps;
        self.ss = (seconds % 60) as u32;
        self.mm = (seconds / 60 % 60) as u32;
        self.hh = (seconds / 3600 % 24) as u32;

        if self.hh == 0 && self.mm == 0 && self.ss == 0 && self.ff == 0 && self.bits == 0 {
            self.negative = false;
        }
    }

    /// Wall-clock seconds between 0:00:00:00 and this timecode.
    pub fn seconds_from_zero(&self) -> f64 {
        self.bits_from_zero() as f64 / BITS_PER_FRAME as f64 / self.framerate.rate()
    }

    pub fn set_seconds_from_zero(&mut self, seconds: f64) {
        let total_bits = (seconds * self.framerate.rate() * BITS_PER_FRAME as f64).round();
        self.set_bits_from_zero(total_bits as i64);
    }

    fn ensure_same_framerate(&self, other: &Timecode) -> Result<()> {
        if self.framerate == other.framerate {
            Ok(())
        } else {
            Err(TimecodeError::FramerateMismatch {
                left: self.framerate,
                right: other.framerate,
            })
        }
    }

    /// Frames from `other` to this timecode.
    pub fn frames_from_timecode(&self, other: &Timecode) -> Result<i64> {
        self.ensure_same_framerate(other)?;
        Ok(self.frames_from_zero() - other.frames_from_zero())
    }

    /// Seconds from `other` to this timecode.
    pub fn seconds_from_timecode(&self, other: &Timecode) -> Result<f64> {
        self.ensure_same_framerate(other)?;
        Ok(self.seconds_from_zero() - other.seconds_from_zero())
    }

    /// Sets this timecode to `other` plus `frames`.
    pub fn set_frames_from_timecode(&mut self, frames: i64, other: &Timecode) -> Result<()> {
        self.ensure_same_framerate(other)?;
        self.set_bits_from_zero(
            other
                .bits_from_zero()
                .saturating_add(frames.saturating_mul(BITS_PER_FRAME)),
        );
        Ok(())
    }

    /// Sets this timecode to `other` plus `seconds`.
    pub fn set_seconds_from_timecode(&mut self, seconds: f64, other: &Timecode) -> Result<()> {
        self.ensure_same_framerate(other)?;
        self.set_seconds_from_zero(other.seconds_from_zero() + seconds);
        Ok(())
    }

    pub fn add_frames(&mut self, frames: i64) {
        self.set_bits_from_zero(
            self.bits_from_zero()
                .saturating_add(frames.saturating_mul(BITS_PER_FRAME)),
        );
    }

    pub fn subtract_frames(&mut self, frames: i64) {
        self.add_frames(frames.saturating_neg());
    }

    pub fn add_seconds(&mut self, seconds: f64) {
        self.set_seconds_from_zero(self.seconds_from_zero() + seconds);
    }

    pub fn subtract_seconds(&mut self, seconds: f64) {
        self.add_seconds(-seconds);
    }

    /// Recalculates the digits at `target`, preserving seconds from 0:00:00:00.
    pub fn convert_framerate_to(&mut self, target: Framerate) {
        let seconds = self.seconds_from_zero();
        self.framerate = target;
        self.set_seconds_from_zero(seconds);
    }

    /// Recalculates the digits at `target`, preserving seconds from the start
    /// of the current hour (hh:00:00:00).
    pub fn convert_framerate_from_reel_start_to(&mut self, target: Framerate) {
        let mut reel_start = Timecode::zero(self.framerate);
        reel_start.set_digits(self.hh.into(), 0, 0, 0, 0, self.negative);
        let offset = self.seconds_from_zero() - reel_start.seconds_from_zero();

        let mut converted = Timecode::zero(target);
        converted.set_digits(self.hh.into(), 0, 0, 0, 0, self.negative);
        converted.add_seconds(offset);
        *self = converted;
    }

    fn digits(&self) -> (u32, u32, u32, u32, u32) {
        (self.hh, self.mm, self.ss, self.ff, self.bits)
    }
}

impl PartialEq for Timecode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timecode {}

impl PartialOrd for Timecode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders by sign, then lexicographically by digits; framerate is ignored.
impl Ord for Timecode {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, false) => self.digits().cmp(&other.digits()),
            (true, true) => other.digits().cmp(&self.digits()),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        }
    }
}
