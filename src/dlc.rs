// pcanbasic/src/dlc.rs
//
// Data length code conversions for CAN 2.0 and CAN FD.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Conversions between a Data Length Code (DLC) and a payload length.
//!
//! For codes up to 8 the DLC is the number of data bytes, for both classic
//! and FD frames. CAN FD maps the remaining codes onto a fixed, non-linear
//! table of larger lengths:
//!
//! ```text
//! DLC:    9  10  11  12  13  14  15
//! Length: 12 16  20  24  32  48  64
//! ```

use crate::ffi::{CANFD_MAX_DLEN, CAN_MAX_DLEN};

/// The valid FD payload lengths above 8 bytes, indexed by `dlc - 9`.
const FD_EXT_LENGTHS: [u8; 7] = [12, 16, 20, 24, 32, 48, 64];

/// Gets the payload length, in bytes, for a data length code.
///
/// A classic frame (`is_standard`) can not carry more than 8 bytes, so any
/// code above 8 is capped. Values outside the 4-bit range are returned
/// unchanged.
pub fn length_from_dlc(dlc: u8, is_standard: bool) -> u8 {
    match dlc {
        0..=8 => dlc,
        _ if is_standard => CAN_MAX_DLEN as u8,
        9..=15 => FD_EXT_LENGTHS[(dlc - 9) as usize],
        _ => dlc,
    }
}

/// Gets the data length code for an exact, valid FD payload length.
///
/// Returns `None` if no DLC encodes exactly `len` bytes.
pub fn dlc_from_length(len: usize) -> Option<u8> {
    match len {
        0..=8 => Some(len as u8),
        _ => FD_EXT_LENGTHS
            .iter()
            .position(|&n| n as usize == len)
            .map(|i| i as u8 + 9),
    }
}

/// Checks whether a given length is a valid CAN FD data length.
///
/// Valid values are `0` through `8`, `12`, `16`, `20`, `24`, `32`, `48`
/// or `64`.
pub fn is_valid_data_len(len: usize) -> bool {
    dlc_from_length(len).is_some()
}

/// Returns the next valid FD data length into which the given length
/// fits, up to a maximum of 64.
pub fn next_valid_fd_length(len: usize) -> usize {
    if len <= CAN_MAX_DLEN {
        return len;
    }
    FD_EXT_LENGTHS
        .iter()
        .map(|&n| n as usize)
        .find(|&n| n >= len)
        .unwrap_or(CANFD_MAX_DLEN)
}

/////////////////////////////////////////////////////////////////////////////
