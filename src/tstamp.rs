//! Rational musical timestamp: whole beats plus a fractional remainder.
//!
//! Grounded on `original_source/src/lib/Tstamp.c`: a timestamp is
//! `(beats: i64, rem: i32)` with `0 <= rem < BEAT`. Comparison is strictly
//! lexicographic on that pair, no special-casing.

use std::cmp::Ordering;
use std::ops::{Add, Sub};

/// Subdivisions per beat. Matches the original library's `KQT_TSTAMP_BEAT`.
pub const BEAT: i64 = 882_161_280;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Tstamp {
    pub beats: i64,
    pub rem: i32,
}

impl Tstamp {
    pub const ZERO: Tstamp = Tstamp { beats: 0, rem: 0 };

    /// Builds a timestamp, normalizing `rem` into `[0, BEAT)` by carrying
    /// into `beats`.
    pub fn new(beats: i64, rem: i64) -> Self {
        let mut b = beats;
        let mut r = rem;
        while r < 0 {
            r += BEAT;
            b -= 1;
        }
        while r >= BEAT {
            r -= BEAT;
            b += 1;
        }
        Tstamp { beats: b, rem: r as i32 }
    }

    pub fn from_beats(beats: i64) -> Self {
        Tstamp { beats, rem: 0 }
    }

    /// Timestamp from a floating-point beat count, for API boundaries that
    /// hand the core plain `f64` beat offsets (e.g. tempo-slide targets).
    pub fn from_f64(beats: f64) -> Self {
        let whole = beats.floor();
        let frac = beats - whole;
        Tstamp::new(whole as i64, (frac * BEAT as f64).round() as i64)
    }

    pub fn to_f64(&self) -> f64 {
        self.beats as f64 + self.rem as f64 / BEAT as f64
    }

    pub fn is_zero(&self) -> bool {
        self.beats == 0 && self.rem == 0
    }

    /// §3: `frames = (beats + rem/BEAT) * 60 * audio_rate / tempo`.
    pub fn to_frames(&self, tempo: f64, audio_rate: f64) -> f64 {
        self.to_f64() * 60.0 * audio_rate / tempo
    }

    pub fn from_frames(frames: f64, tempo: f64, audio_rate: f64) -> Self {
        Tstamp::from_f64(frames * tempo / (60.0 * audio_rate))
    }
}

impl Default for Tstamp {
    fn default() -> Self {
        Tstamp::ZERO
    }
}

impl PartialOrd for Tstamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tstamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.beats.cmp(&other.beats).then(self.rem.cmp(&other.rem))
    }
}

impl Add for Tstamp {
    type Output = Tstamp;
    fn add(self, rhs: Tstamp) -> Tstamp {
        Tstamp::new(self.beats + rhs.beats, (self.rem + rhs.rem) as i64)
    }
}

impl Sub for Tstamp {
    type Output = Tstamp;
    fn sub(self, rhs: Tstamp) -> Tstamp {
        Tstamp::new(self.beats - rhs.beats, (self.rem - rhs.rem) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_negative_remainder() {
        let t = Tstamp::new(2, -1);
        assert_eq!(t.beats, 1);
        assert_eq!(t.rem, BEAT as i32 - 1);
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(Tstamp::new(1, 0) < Tstamp::new(1, 1));
        assert!(Tstamp::new(0, BEAT - 1) < Tstamp::new(1, 0));
    }

    #[test]
    fn add_carries_into_beats() {
        let a = Tstamp::new(0, BEAT - 10);
        let b = Tstamp::new(0, 20);
        let sum = a + b;
        assert_eq!(sum.beats, 1);
        assert_eq!(sum.rem, 10);
    }

    #[test]
    fn f64_round_trip_is_close() {
        let t = Tstamp::from_f64(2.5);
        assert!((t.to_f64() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn frames_round_trip_within_one_frame() {
        let t = Tstamp::from_beats(2);
        let frames = t.to_frames(120.0, 44100.0);
        let back = Tstamp::from_frames(frames, 120.0, 44100.0);
        assert!((t.to_f64() - back.to_f64()).abs() * (BEAT as f64) < 1.0);
    }
}
