// pcanbasic/src/session.rs
//
// A connection to one PCAN channel, with its receive view.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The session.
//!
//! A [`Session`] holds everything an application needs to monitor and
//! talk to one channel at a time: the driver binding, the message tracker
//! that collects received traffic, the connected channel, and the reader
//! that feeds the tracker. The application owns the session and drives it
//! from its own event loop:
//!
//! ```no_run
//! use pcanbasic::{ffi, params::Bitrate, PcanBasic, ReadMode, Session};
//! use std::sync::Arc;
//!
//! let mut session = Session::new(Arc::new(PcanBasic::new()));
//! let sts = session.connect(ffi::PCAN_USBBUS1, Bitrate::BAUD_500K);
//! assert!(sts.is_ok());
//! session.set_read_mode(ReadMode::Event).unwrap();
//!
//! for rec in session.display_tick() {
//!     println!("{} {} {}", rec.id_string(), rec.count(), rec.data_string());
//! }
//! ```

use crate::{
    ffi::{self, Handle},
    params::{Bitrate, HardwareType, Language, Parameter},
    reader::{ReadMode, ReadTarget, Reader, ReaderConfig},
    tracker::{MessageRecord, MessageTracker},
    CanFdFrame, CanFrame, MessageType, PcanBasic, Result, Status,
};
use log::{info, warn};
use std::sync::Arc;

// ===== Filter =====

/// A configuration of the receive filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterConfig {
    /// Receive every frame
    Open,
    /// Receive nothing
    Close,
    /// Receive a range of IDs, added to the current filter
    Custom {
        /// The first ID of the range
        from_id: u32,
        /// The last ID of the range
        to_id: u32,
        /// Whether the range is of 29-bit IDs
        extended: bool,
    },
}

/// The state of the receive filter, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Every frame is received
    Open,
    /// Nothing is received
    Closed,
    /// Some ranges of IDs are received
    Custom,
}

impl FilterState {
    fn from_raw(val: u32) -> Option<Self> {
        match val {
            ffi::PCAN_FILTER_OPEN => Some(Self::Open),
            ffi::PCAN_FILTER_CLOSE => Some(Self::Closed),
            ffi::PCAN_FILTER_CUSTOM => Some(Self::Custom),
            _ => None,
        }
    }
}

// ===== Session =====

/// The connected channel.
#[derive(Debug)]
struct Connection {
    channel: Handle,
    is_fd: bool,
    reader: Reader,
}

/// Application state for working with one channel at a time.
#[derive(Debug)]
pub struct Session {
    pcan: Arc<PcanBasic>,
    tracker: Arc<MessageTracker>,
    config: ReaderConfig,
    read_mode: ReadMode,
    conn: Option<Connection>,
}

impl Session {
    /// Creates a session with the default reader timing.
    pub fn new(pcan: Arc<PcanBasic>) -> Self {
        Self::with_config(pcan, ReaderConfig::default())
    }

    /// Creates a session with specific reader timing.
    pub fn with_config(pcan: Arc<PcanBasic>, config: ReaderConfig) -> Self {
        Self {
            pcan,
            tracker: Arc::new(MessageTracker::new()),
            config,
            read_mode: ReadMode::default(),
            conn: None,
        }
    }

    /// The driver binding
    pub fn pcan(&self) -> &Arc<PcanBasic> {
        &self.pcan
    }

    /// The store of received messages
    pub fn tracker(&self) -> &Arc<MessageTracker> {
        &self.tracker
    }

    /// The reader timing
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Whether a channel is connected
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// The connected channel, if any
    pub fn channel(&self) -> Option<Handle> {
        self.conn.as_ref().map(|c| c.channel)
    }

    /// Whether the connected channel is in FD mode
    pub fn is_fd(&self) -> bool {
        self.conn.as_ref().map(|c| c.is_fd).unwrap_or(false)
    }

    /// The read mode that is, or will be, used for the channel
    pub fn read_mode(&self) -> ReadMode {
        self.read_mode
    }

    /// Connects a plug-and-play channel in classic CAN mode.
    pub fn connect(&mut self, channel: Handle, bitrate: Bitrate) -> Status {
        self.connect_classic(channel, bitrate, HardwareType::default(), 0, 0)
    }

    /// Connects a channel in classic CAN mode.
    ///
    /// The hardware type, I/O port and interrupt are only needed for
    /// non-plug-and-play hardware. Any connected channel is released first.
    pub fn connect_classic(
        &mut self,
        channel: Handle,
        bitrate: Bitrate,
        hw_type: HardwareType,
        io_port: u32,
        interrupt: u16,
    ) -> Status {
        self.release();
        let sts = self
            .pcan
            .initialize(channel, bitrate, hw_type, io_port, interrupt);
        self.connected(channel, false, sts)
    }

    /// Connects a channel in CAN FD mode, with an FD bit rate string.
    ///
    /// Any connected channel is released first.
    pub fn connect_fd(&mut self, channel: Handle, bitrate_fd: &str) -> Status {
        self.release();
        let sts = self.pcan.initialize_fd(channel, bitrate_fd);
        self.connected(channel, true, sts)
    }

    // Finishes a connection attempt. A caution means the driver is using a
    // different bit rate than requested, but the channel is usable.
    fn connected(&mut self, channel: Handle, is_fd: bool, sts: Status) -> Status {
        let sts = match sts {
            Status::CAUTION => {
                warn!("The bitrate being used is different than the given one");
                Status::OK
            }
            sts => sts,
        };
        if !sts.is_ok() {
            warn!("Unable to connect {:X}h: {}", channel, self.format_error(sts));
            return sts;
        }

        info!("Connected {:X}h{}", channel, if is_fd { " (FD)" } else { "" });
        let target = ReadTarget::new(self.pcan.clone(), self.tracker.clone(), channel, is_fd);
        let mut reader = Reader::new(target, self.config);
        if let Err(err) = reader.set_mode(self.read_mode) {
            warn!("Unable to start the {} reader: {}", self.read_mode, err);
        }
        self.conn = Some(Connection {
            channel,
            is_fd,
            reader,
        });
        sts
    }

    /// Stops reading and releases the connected channel.
    ///
    /// Returns `Status::INITIALIZE` if nothing was connected.
    pub fn release(&mut self) -> Status {
        match self.conn.take() {
            Some(mut conn) => {
                conn.reader.stop();
                let sts = self.pcan.uninitialize(conn.channel);
                info!("Released {:X}h", conn.channel);
                sts
            }
            None => Status::INITIALIZE,
        }
    }

    /// Selects how received frames are read.
    ///
    /// If a channel is connected, any running reader is stopped before the
    /// new one starts.
    pub fn set_read_mode(&mut self, mode: ReadMode) -> Result<()> {
        self.read_mode = mode;
        match self.conn.as_mut() {
            Some(conn) => conn.reader.set_mode(mode),
            None => Ok(()),
        }
    }

    /// Reads one frame from the connected channel.
    pub fn read_manual(&self) -> Status {
        match &self.conn {
            Some(conn) => conn.reader.read_manual(),
            None => Status::INITIALIZE,
        }
    }

    /// Gets the records that changed since the last tick.
    pub fn display_tick(&self) -> Vec<MessageRecord> {
        self.tracker.snapshot_dirty()
    }

    /// Switches between showing message periods and absolute times.
    pub fn set_show_period(&self, show_period: bool) {
        self.tracker.set_global_period_mode(show_period);
    }

    /// Forgets every received message.
    pub fn clear(&self) {
        self.tracker.clear();
    }

    /// Transmits a classic frame on the connected channel.
    pub fn write(&self, frame: &CanFrame) -> Status {
        match &self.conn {
            Some(conn) => self.pcan.write(conn.channel, frame),
            None => Status::INITIALIZE,
        }
    }

    /// Transmits an FD frame on the connected channel.
    pub fn write_fd(&self, frame: &CanFdFrame) -> Status {
        match &self.conn {
            Some(conn) => self.pcan.write_fd(conn.channel, frame),
            None => Status::INITIALIZE,
        }
    }

    /// Gets the bus status of the connected channel.
    pub fn get_status(&self) -> Status {
        match &self.conn {
            Some(conn) => self.pcan.get_status(conn.channel),
            None => Status::INITIALIZE,
        }
    }

    /// Resets the queues of the connected channel.
    pub fn reset(&self) -> Status {
        match &self.conn {
            Some(conn) => self.pcan.reset(conn.channel),
            None => Status::INITIALIZE,
        }
    }

    /// Gets the state of the receive filter.
    pub fn query_filter(&self) -> (Status, Option<FilterState>) {
        let Some(conn) = &self.conn else {
            return (Status::INITIALIZE, None);
        };
        let (sts, val) = self.pcan.get_u32(conn.channel, Parameter::MESSAGE_FILTER);
        if sts.is_ok() {
            (sts, FilterState::from_raw(val))
        } else {
            (sts, None)
        }
    }

    /// Configures the receive filter.
    ///
    /// The current filter state is read first, and its failure is
    /// returned without changing anything.
    pub fn configure_filter(&self, filter: FilterConfig) -> Status {
        let (sts, _) = self.query_filter();
        if !sts.is_ok() {
            return sts;
        }
        let Some(conn) = &self.conn else {
            return Status::INITIALIZE;
        };

        let sts = match filter {
            FilterConfig::Open => {
                self.pcan
                    .set_u32(conn.channel, Parameter::MESSAGE_FILTER, ffi::PCAN_FILTER_OPEN)
            }
            FilterConfig::Close => {
                self.pcan
                    .set_u32(conn.channel, Parameter::MESSAGE_FILTER, ffi::PCAN_FILTER_CLOSE)
            }
            FilterConfig::Custom {
                from_id,
                to_id,
                extended,
            } => {
                let mode = if extended {
                    MessageType::EXTENDED
                } else {
                    MessageType::STANDARD
                };
                self.pcan.filter_messages(conn.channel, from_id, to_id, mode)
            }
        };
        if sts.is_ok() {
            info!("Receive filter set to {:?}", filter);
        }
        sts
    }

    /// Describes a status in the system language.
    pub fn format_error(&self, sts: Status) -> String {
        self.pcan.formatted_error(sts, Language::NEUTRAL)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}
