// pcanbasic/src/timestamp.rs
//
// Receive timestamps of PCAN frames.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Receive timestamps.
//!
//! The FD API reports a single 64-bit microsecond counter. The classic API
//! splits the time into milliseconds, a millisecond rollover count, and
//! the remaining microseconds. Both are normalized to [`Timestamp`].

use crate::ffi::{TPCANTimestamp, TPCANTimestampFD};
use std::fmt;

/// Microseconds in one overflow period of the 32-bit millisecond counter.
const MILLIS_OVERFLOW_MICROS: u64 = 0x1_0000_0000 * 1000;

/// A receive timestamp, in microseconds.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Creates a timestamp from a count of microseconds.
    pub const fn from_micros(us: u64) -> Self {
        Self(us)
    }

    /// Gets the count of microseconds.
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Gets the time in (fractional) milliseconds.
    pub fn as_millis_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl From<TPCANTimestamp> for Timestamp {
    /// Combines the parts of a classic timestamp:
    /// `micros + 1000 * millis + 2^32 * 1000 * millis_overflow`
    fn from(ts: TPCANTimestamp) -> Self {
        Self(
            u64::from(ts.micros)
                + 1000 * u64::from(ts.millis)
                + MILLIS_OVERFLOW_MICROS * u64::from(ts.millis_overflow),
        )
    }
}

impl From<TPCANTimestampFD> for Timestamp {
    fn from(us: TPCANTimestampFD) -> Self {
        Self(us)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for Timestamp {
    /// Formats as milliseconds with one decimal place.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.1}", self.as_millis_f64())
    }
}

/////////////////////////////////////////////////////////////////////////////
