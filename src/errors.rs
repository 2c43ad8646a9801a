// pcanbasic/src/errors.rs
//
// Implements errors for the Rust PCAN-Basic library.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Driver status codes and library errors.
//!
//! Every call into the driver reports a [`Status`]. This is a bitmask in
//! which zero is success. Most non-zero values are failures, but two have
//! special meaning while reading:
//!
//! ```text
//! Queue empty       (0x00020)   => no data right now, not an error
//! Illegal operation (0x8000000) => stop reading immediately
//! ```
//!
//! The driver-facing API never panics or returns `Err(..)`. Problems outside
//! of the driver, such as building an invalid frame or failing to load the
//! library, are reported with the error types in this module.

use crate::ffi;
use std::{error, fmt, io};
use thiserror::Error;

// ===== Status =====

/// A status code as returned by every PCAN-Basic function.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Status(pub u32);

impl Status {
    /// No error.
    pub const OK: Self = Self(ffi::PCAN_ERROR_OK);
    /// Transmit buffer in CAN controller is full
    pub const XMTFULL: Self = Self(ffi::PCAN_ERROR_XMTFULL);
    /// CAN controller was read too late
    pub const OVERRUN: Self = Self(ffi::PCAN_ERROR_OVERRUN);
    /// Bus error: an error counter reached the 'light' limit
    pub const BUSLIGHT: Self = Self(ffi::PCAN_ERROR_BUSLIGHT);
    /// Bus error: an error counter reached the 'heavy' limit
    pub const BUSHEAVY: Self = Self(ffi::PCAN_ERROR_BUSHEAVY);
    /// Bus error: an error counter reached the 'warning' limit (FD)
    pub const BUSWARNING: Self = Self(ffi::PCAN_ERROR_BUSWARNING);
    /// Bus error: the CAN controller is error passive
    pub const BUSPASSIVE: Self = Self(ffi::PCAN_ERROR_BUSPASSIVE);
    /// Bus error: the CAN controller is in bus-off state
    pub const BUSOFF: Self = Self(ffi::PCAN_ERROR_BUSOFF);
    /// Mask for all bus errors
    pub const ANYBUSERR: Self = Self(ffi::PCAN_ERROR_ANYBUSERR);
    /// Receive queue is empty
    pub const QRCVEMPTY: Self = Self(ffi::PCAN_ERROR_QRCVEMPTY);
    /// Receive queue was read too late
    pub const QOVERRUN: Self = Self(ffi::PCAN_ERROR_QOVERRUN);
    /// Transmit queue is full
    pub const QXMTFULL: Self = Self(ffi::PCAN_ERROR_QXMTFULL);
    /// Test of the CAN controller hardware registers failed
    pub const REGTEST: Self = Self(ffi::PCAN_ERROR_REGTEST);
    /// Driver not loaded
    pub const NODRIVER: Self = Self(ffi::PCAN_ERROR_NODRIVER);
    /// Hardware already in use by a Net
    pub const HWINUSE: Self = Self(ffi::PCAN_ERROR_HWINUSE);
    /// A Client is already connected to the Net
    pub const NETINUSE: Self = Self(ffi::PCAN_ERROR_NETINUSE);
    /// Hardware handle is invalid
    pub const ILLHW: Self = Self(ffi::PCAN_ERROR_ILLHW);
    /// Net handle is invalid
    pub const ILLNET: Self = Self(ffi::PCAN_ERROR_ILLNET);
    /// Client handle is invalid
    pub const ILLCLIENT: Self = Self(ffi::PCAN_ERROR_ILLCLIENT);
    /// Resource (FIFO, Client, timeout) cannot be created
    pub const RESOURCE: Self = Self(ffi::PCAN_ERROR_RESOURCE);
    /// Invalid parameter
    pub const ILLPARAMTYPE: Self = Self(ffi::PCAN_ERROR_ILLPARAMTYPE);
    /// Invalid parameter value
    pub const ILLPARAMVAL: Self = Self(ffi::PCAN_ERROR_ILLPARAMVAL);
    /// Unknown error
    pub const UNKNOWN: Self = Self(ffi::PCAN_ERROR_UNKNOWN);
    /// Invalid data, function, or action
    pub const ILLDATA: Self = Self(ffi::PCAN_ERROR_ILLDATA);
    /// Driver object state is wrong for the attempted operation
    pub const ILLMODE: Self = Self(ffi::PCAN_ERROR_ILLMODE);
    /// An operation was successfully carried out, however, irregularities
    /// were registered
    pub const CAUTION: Self = Self(ffi::PCAN_ERROR_CAUTION);
    /// Channel is not initialized
    pub const INITIALIZE: Self = Self(ffi::PCAN_ERROR_INITIALIZE);
    /// Invalid operation
    pub const ILLOPERATION: Self = Self(ffi::PCAN_ERROR_ILLOPERATION);

    /// Gets the raw code.
    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Whether this is the success value.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.0 == ffi::PCAN_ERROR_OK
    }

    /// Whether the receive queue has been emptied.
    ///
    /// This is a bit test. The driver may report the queue-empty bit along
    /// with other bits.
    #[inline]
    pub fn is_queue_empty(&self) -> bool {
        self.contains(Self::QRCVEMPTY)
    }

    /// Whether the driver rejected the operation outright.
    ///
    /// Unlike the other tests this is an exact match.
    #[inline]
    pub fn is_illegal_operation(&self) -> bool {
        *self == Self::ILLOPERATION
    }

    /// Whether a read with this status delivered a frame.
    ///
    /// The driver hands over a frame on success, and also when reporting
    /// a bus state change or an overrun alongside it.
    #[inline]
    pub fn carries_frame(&self) -> bool {
        const WITH_FRAME: u32 =
            ffi::PCAN_ERROR_ANYBUSERR | ffi::PCAN_ERROR_OVERRUN | ffi::PCAN_ERROR_QOVERRUN;
        self.0 & !WITH_FRAME == 0
    }

    /// Whether any bus error bit is set.
    #[inline]
    pub fn is_bus_error(&self) -> bool {
        self.0 & ffi::PCAN_ERROR_ANYBUSERR != 0
    }

    /// Whether all the bits in `other` are set in this status.
    #[inline]
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Converts the status into a `Result`, treating everything but
    /// success as an error.
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(Error::Driver(self))
        }
    }

    /// Gets a short name for the bus state reported by `CAN_GetStatus`.
    ///
    /// The "warning" level is called "heavy" on classic controllers.
    pub fn bus_state_name(&self, is_fd: bool) -> &'static str {
        match *self {
            Self::INITIALIZE => "PCAN_ERROR_INITIALIZE",
            Self::BUSLIGHT => "PCAN_ERROR_BUSLIGHT",
            Self::BUSHEAVY if is_fd => "PCAN_ERROR_BUSWARNING",
            Self::BUSHEAVY => "PCAN_ERROR_BUSHEAVY",
            Self::BUSPASSIVE => "PCAN_ERROR_BUSPASSIVE",
            Self::BUSOFF => "PCAN_ERROR_BUSOFF",
            Self::OK => "PCAN_ERROR_OK",
            _ => "See Documentation",
        }
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl From<Status> for u32 {
    fn from(sts: Status) -> Self {
        sts.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PCAN status {:X}h", self.0)
    }
}

impl fmt::UpperHex for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl error::Error for Status {}

// ===== ConstructionError =====

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Error that occurs when creating CAN frames
pub enum ConstructionError {
    /// Trying to create a specific frame type from an incompatible type
    WrongFrameType,
    /// Larger payload reported than can be held in the frame.
    TooMuchData,
}

impl error::Error for ConstructionError {}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ConstructionError::*;
        match *self {
            WrongFrameType => write!(f, "Incompatible frame type"),
            TooMuchData => write!(f, "Payload is too large"),
        }
    }
}

// ===== BindError =====

/// Failure to bind to the vendor driver library.
#[derive(Error, Debug)]
pub enum BindError {
    /// The shared library could not be loaded
    #[error("unable to load {name}: {source}")]
    Library {
        /// The name or path that was tried
        name: String,
        /// The loader error
        #[source]
        source: libloading::Error,
    },
    /// A required function is not exported by the library
    #[error("the library does not export '{0}'")]
    MissingExport(&'static str),
}

// ===== Composite Error for the library =====

/// Composite error for the session layer and the utilities.
#[derive(Error, Debug)]
pub enum Error {
    /// A status reported by the driver
    #[error(transparent)]
    Driver(#[from] Status),
    /// The driver library is not available
    #[error(transparent)]
    Bind(#[from] BindError),
    /// A frame could not be built
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    /// Error parsing a frame from text
    #[error(transparent)]
    Parse(#[from] crate::frame::ParseError),
    /// A lower-level I/O error
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A result that can derive from any of the PCAN errors.
pub type Result<T> = std::result::Result<T, Error>;

/////////////////////////////////////////////////////////////////////////////
