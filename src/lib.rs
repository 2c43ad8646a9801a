// pcanbasic/src/lib.rs
//
// The main lib file for the PCAN-Basic Rust library.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! PCAN-Basic support.
//!
//! PEAK-System CAN adapters are driven through the vendor's PCAN-Basic
//! library, a shared library with a small C API. This crate loads that
//! library at runtime, wraps its calls and data structures in Rust types,
//! and builds a live monitor of the bus on top of it.
//!
//! # An introduction to CAN
//!
//! The CAN bus was originally designed to allow microcontrollers inside a
//! vehicle to communicate over a single shared bus. Messages called
//! *frames* are multicast to all devices on the bus.
//!
//! Every frame consists of an ID and a payload of up to 8 bytes, or up to
//! 64 bytes for CAN FD. If two devices attempt to send a frame at the same
//! time, the device with the higher ID will notice the conflict, stop
//! sending and reattempt to send its frame in the next time slot. This
//! means that the lower the ID, the higher the priority.
//!
//! # Layout
//!
//! - [`driver`]: the runtime binding to the vendor library. If the library
//!   can't be loaded, every call reports [`Status::UNKNOWN`] and nothing
//!   ever reaches the driver.
//! - [`channel`]: the channels that can be opened, and their display names.
//! - [`frame`]: classic and FD frames, with the display helpers.
//! - [`tracker`]: one record per distinct received message, with a dirty
//!   flag for incremental display.
//! - [`reader`]: the timer, event, and manual receive paths.
//! - [`session`]: a connection to one channel, tying the above together.
//!
//! ```no_run
//! use pcanbasic::{enumerate_channels, PcanBasic};
//!
//! let pcan = PcanBasic::new();
//! for entry in enumerate_channels(&pcan).entries {
//!     println!("{}", entry);
//! }
//! ```

pub use embedded_can::{self, ExtendedId, Frame as EmbeddedFrame, Id, StandardId};

pub mod ffi;

pub mod id;
pub use id::MessageType;

pub mod dlc;
pub use dlc::length_from_dlc;

pub mod errors;
pub use errors::{BindError, ConstructionError, Error, Result, Status};

pub mod timestamp;
pub use timestamp::Timestamp;

pub mod frame;
pub use frame::{CanFdFrame, CanFrame, ParseError};

pub mod params;
pub use params::{Bitrate, HardwareType, Language, Parameter};

pub mod driver;
pub use driver::{Api, LibraryLoader, Loader, PcanBasic};

pub mod channel;
pub use channel::{enumerate_channels, format_channel_name, ChannelEntry, ChannelList};

pub mod tracker;
pub use tracker::{MessageRecord, MessageTracker, Processed};

pub mod reader;
pub use reader::{ReadMode, ReadTarget, Reader, ReaderConfig, ReceiveEvent};

pub mod session;
pub use session::{FilterConfig, FilterState, Session};
