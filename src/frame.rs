// pcanbasic/src/frame.rs
//
// Implements frames for CANbus 2.0 and FD for PCAN-Basic.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN bus frames.
//!
//! At the lowest level, the driver defines the CAN frames as C structs
//! (see [`ffi`](crate::ffi)):
//! - `TPCANMsg` The Classic CAN 2.0 frame with up to 8 bytes of data.
//! - `TPCANMsgFD` The CAN Flexible Data Rate frame with up to 64 bytes
//!   of data, selected by a data length code.
//!
//! These are wrapped here by [`CanFrame`] and [`CanFdFrame`]. Since the FD
//! message can also hold any classic frame, it's the common shape that
//! received traffic is normalized to before being tracked or displayed.
//!

use crate::{
    dlc::{self, length_from_dlc},
    ffi::{TPCANMsg, TPCANMsgFD, CANFD_MAX_DLEN, CAN_MAX_DLEN},
    id::{id_from_parts, id_from_raw, id_to_raw, MessageType, CAN_EFF_MASK, CAN_SFF_MASK},
    ConstructionError,
};
use embedded_can::{ExtendedId, Frame as EmbeddedFrame, Id, StandardId};
use hex::FromHex;
use itertools::Itertools;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Gets the embedded HAL Id from the raw parts of a frame.
///
/// Bits outside of the ID range for the frame type are ignored.
fn hal_id(id: u32, msgtype: MessageType) -> Id {
    if msgtype.contains(MessageType::EXTENDED) {
        ExtendedId::new(id & CAN_EFF_MASK)
            .unwrap_or(ExtendedId::ZERO)
            .into()
    } else {
        StandardId::new((id & CAN_SFF_MASK) as u16)
            .unwrap_or(StandardId::ZERO)
            .into()
    }
}

// ===== CanFrame =====

/// The classic CAN 2.0 frame with up to 8-bytes of data.
///
/// This is binary compatible with `TPCANMsg` from the driver.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CanFrame(TPCANMsg);

impl CanFrame {
    /// Creates a data frame with an explicit message type.
    pub fn with_type(
        id: impl Into<Id>,
        data: &[u8],
        msgtype: MessageType,
    ) -> Result<Self, ConstructionError> {
        if data.len() > CAN_MAX_DLEN {
            return Err(ConstructionError::TooMuchData);
        }
        if msgtype.contains(MessageType::FD) {
            return Err(ConstructionError::WrongFrameType);
        }
        let id = id.into();
        let mut msg = TPCANMsg {
            id: id_to_raw(id),
            msgtype: (msgtype | MessageType::for_id(&id)).bits(),
            len: data.len() as u8,
            ..TPCANMsg::default()
        };
        msg.data[..data.len()].copy_from_slice(data);
        Ok(Self(msg))
    }

    /// Gets the PCAN message type of the frame.
    pub fn msg_type(&self) -> MessageType {
        MessageType::from_bits_retain(self.0.msgtype)
    }

    /// Gets the raw numeric ID
    pub fn raw_id(&self) -> u32 {
        self.0.id
    }

    /// Gets the length field exactly as reported by the driver.
    ///
    /// This can claim more than the 8 bytes the frame can hold.
    pub fn raw_len(&self) -> u8 {
        self.0.len
    }

    /// Gets a reference to the underlying driver struct.
    pub fn as_raw(&self) -> &TPCANMsg {
        &self.0
    }
}

impl EmbeddedFrame for CanFrame {
    /// Create a new CAN 2.0 data frame
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::with_type(id, data, MessageType::STANDARD).ok()
    }

    /// Create a new remote transmission request frame.
    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > CAN_MAX_DLEN {
            return None;
        }
        let mut frame = Self::with_type(id, &[], MessageType::RTR).ok()?;
        frame.0.len = dlc as u8;
        Some(frame)
    }

    /// Check if frame uses 29-bit extended ID format.
    fn is_extended(&self) -> bool {
        self.msg_type().contains(MessageType::EXTENDED)
    }

    /// Check if frame is a remote transmission request.
    fn is_remote_frame(&self) -> bool {
        self.msg_type().contains(MessageType::RTR)
    }

    /// Return the frame identifier.
    fn id(&self) -> Id {
        hal_id(self.0.id, self.msg_type())
    }

    /// Data length code
    fn dlc(&self) -> usize {
        self.0.len as usize
    }

    /// A slice into the actual data. Never longer than 8 bytes.
    fn data(&self) -> &[u8] {
        let n = (self.0.len as usize).min(CAN_MAX_DLEN);
        &self.0.data[..n]
    }
}

impl fmt::Debug for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CanFrame {{ ")?;
        fmt::UpperHex::fmt(self, f)?;
        write!(f, " }}")
    }
}

impl fmt::UpperHex for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{:X}#", self.0.id)?;
        let mut parts = self.data().iter().map(|v| format!("{:02X}", v));
        write!(f, "{}", parts.join(" "))
    }
}

impl From<TPCANMsg> for CanFrame {
    fn from(msg: TPCANMsg) -> Self {
        Self(msg)
    }
}

impl AsRef<TPCANMsg> for CanFrame {
    fn as_ref(&self) -> &TPCANMsg {
        &self.0
    }
}

impl TryFrom<CanFdFrame> for CanFrame {
    type Error = ConstructionError;

    fn try_from(frame: CanFdFrame) -> Result<Self, Self::Error> {
        if frame.is_fd() || frame.0.dlc as usize > CAN_MAX_DLEN {
            return Err(ConstructionError::WrongFrameType);
        }
        let mut msg = TPCANMsg {
            id: frame.0.id,
            msgtype: frame.0.msgtype,
            len: frame.0.dlc,
            ..TPCANMsg::default()
        };
        msg.data.copy_from_slice(&frame.0.data[..CAN_MAX_DLEN]);
        Ok(Self(msg))
    }
}

// ===== CanFdFrame =====

/// The CAN flexible data rate frame with up to 64-bytes of data.
///
/// This is binary compatible with `TPCANMsgFD` from the driver. When an FD
/// channel receives classic traffic, the frame has no `FD` bit in its type
/// and the data length code is capped at 8 bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct CanFdFrame(TPCANMsgFD);

impl CanFdFrame {
    /// Creates an FD data frame with extra message type flags, such as
    /// `BRS`.
    ///
    /// The `FD` bit is always set, and the `EXTENDED` bit follows the ID.
    /// Data that is not a valid FD length is zero-padded to the next one.
    pub fn with_flags(
        id: impl Into<Id>,
        data: &[u8],
        flags: MessageType,
    ) -> Result<Self, ConstructionError> {
        if flags.contains(MessageType::RTR) {
            return Err(ConstructionError::WrongFrameType);
        }
        let id = id.into();
        let mut frame = Self(TPCANMsgFD {
            id: id_to_raw(id),
            msgtype: (flags | MessageType::FD | MessageType::for_id(&id)).bits(),
            ..TPCANMsgFD::default()
        });
        frame.set_data(data)?;
        Ok(frame)
    }

    /// Gets the PCAN message type of the frame.
    pub fn msg_type(&self) -> MessageType {
        MessageType::from_bits_retain(self.0.msgtype)
    }

    /// Gets the raw numeric ID
    pub fn raw_id(&self) -> u32 {
        self.0.id
    }

    /// Whether this is a CAN FD frame rather than a classic one.
    pub fn is_fd(&self) -> bool {
        self.msg_type().contains(MessageType::FD)
    }

    /// Whether the frame uses a bit rate switch (second bit rate for
    /// payload data).
    pub fn is_brs(&self) -> bool {
        self.msg_type().contains(MessageType::BRS)
    }

    /// Sets whether the frame uses a bit rate switch.
    pub fn set_brs(&mut self, on: bool) {
        let mut t = self.msg_type();
        t.set(MessageType::BRS, on);
        self.0.msgtype = t.bits();
    }

    /// Gets the error state indicator of the transmitting node
    pub fn is_esi(&self) -> bool {
        self.msg_type().contains(MessageType::ESI)
    }

    /// Whether the frame was echoed back by the driver after transmission
    pub fn is_echo(&self) -> bool {
        self.msg_type().contains(MessageType::ECHO)
    }

    /// Whether the frame carries status information from the hardware
    pub fn is_status(&self) -> bool {
        self.msg_type().contains(MessageType::STATUS)
    }

    /// Check if frame is an error frame
    pub fn is_error_frame(&self) -> bool {
        self.msg_type().contains(MessageType::ERRFRAME)
    }

    /// The number of data bytes in the frame, decoded from the DLC.
    pub fn len(&self) -> usize {
        length_from_dlc(self.0.dlc, !self.is_fd()) as usize
    }

    /// Whether the frame carries no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets the data payload of the frame.
    ///
    /// A classic frame takes up to 8 bytes. An FD frame takes up to 64,
    /// padded with zeros to the next valid FD length.
    pub fn set_data(&mut self, data: &[u8]) -> Result<(), ConstructionError> {
        let max = if self.is_fd() {
            CANFD_MAX_DLEN
        } else {
            CAN_MAX_DLEN
        };
        if data.len() > max {
            return Err(ConstructionError::TooMuchData);
        }
        let len = dlc::next_valid_fd_length(data.len());
        self.0.data = [0; CANFD_MAX_DLEN];
        self.0.data[..data.len()].copy_from_slice(data);
        self.0.dlc = dlc::dlc_from_length(len).ok_or(ConstructionError::TooMuchData)?;
        Ok(())
    }

    /// Gets a reference to the underlying driver struct.
    pub fn as_raw(&self) -> &TPCANMsgFD {
        &self.0
    }

    // ----- Display helpers -----

    /// A short description of the frame type.
    ///
    /// Examples are `STD`, `EXT/RTR`, `STD [ FD BRS ]`, `EXT [ ECHO FD ]`,
    /// `STATUS` and `ERROR`.
    pub fn type_string(&self) -> String {
        let t = self.msg_type();

        if t.contains(MessageType::STATUS) {
            return "STATUS".into();
        }
        if t.contains(MessageType::ERRFRAME) {
            return "ERROR".into();
        }

        let mut s = String::from(if t.contains(MessageType::EXTENDED) {
            "EXT"
        } else {
            "STD"
        });

        if t.contains(MessageType::RTR) {
            s += if t.contains(MessageType::ECHO) {
                "/RTR [ ECHO ]"
            } else {
                "/RTR"
            };
        } else if t.bits() > MessageType::EXTENDED.bits() {
            s += if t.contains(MessageType::ECHO) {
                " [ ECHO"
            } else {
                " [ "
            };
            if t.contains(MessageType::FD) {
                s += " FD";
            }
            if t.contains(MessageType::BRS) {
                s += " BRS";
            }
            if t.contains(MessageType::ESI) {
                s += " ESI";
            }
            s += " ]";
        }
        s
    }

    /// The ID in hex, padded to 8 digits for extended frames and 3 digits
    /// for standard ones, with an `h` suffix.
    pub fn id_string(&self) -> String {
        if self.msg_type().contains(MessageType::EXTENDED) {
            format!("{:08X}h", self.0.id)
        } else {
            format!("{:03X}h", self.0.id)
        }
    }

    /// The data bytes in hex, each preceded by a space, or
    /// `Remote Request` for an RTR frame.
    pub fn data_string(&self) -> String {
        if self.msg_type().contains(MessageType::RTR) {
            return "Remote Request".into();
        }
        self.data().iter().map(|b| format!(" {:02X}", b)).join("")
    }
}

impl EmbeddedFrame for CanFdFrame {
    /// Create a new FD frame
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::with_flags(id, data, MessageType::empty()).ok()
    }

    /// Creates a classic remote request in the FD message shape.
    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > CAN_MAX_DLEN {
            return None;
        }
        CanFrame::new_remote(id, dlc).map(Self::from)
    }

    /// Check if frame uses 29-bit extended ID format.
    fn is_extended(&self) -> bool {
        self.msg_type().contains(MessageType::EXTENDED)
    }

    /// Check if frame is a remote transmission request.
    fn is_remote_frame(&self) -> bool {
        self.msg_type().contains(MessageType::RTR)
    }

    /// Return the frame identifier.
    fn id(&self) -> Id {
        hal_id(self.0.id, self.msg_type())
    }

    /// Data length code
    fn dlc(&self) -> usize {
        self.0.dlc as usize
    }

    /// A slice into the actual data.
    fn data(&self) -> &[u8] {
        let n = self.len().min(CANFD_MAX_DLEN);
        &self.0.data[..n]
    }
}

impl fmt::Debug for CanFdFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CanFdFrame {{ ")?;
        fmt::UpperHex::fmt(self, f)?;
        write!(f, " }}")
    }
}

impl fmt::UpperHex for CanFdFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{:X}##", self.0.id)?;
        write!(f, "{:02X} ", self.0.msgtype)?;
        let mut parts = self.data().iter().map(|v| format!("{:02X}", v));
        write!(f, "{}", parts.join(" "))
    }
}

impl From<TPCANMsgFD> for CanFdFrame {
    fn from(msg: TPCANMsgFD) -> Self {
        Self(msg)
    }
}

impl AsRef<TPCANMsgFD> for CanFdFrame {
    fn as_ref(&self) -> &TPCANMsgFD {
        &self.0
    }
}

impl From<CanFrame> for CanFdFrame {
    /// Normalizes a classic frame into the FD shape.
    ///
    /// The ID and type are copied directly and the DLC takes the classic
    /// length field as-is, but no more than 8 data bytes are ever copied.
    fn from(frame: CanFrame) -> Self {
        let msg = frame.0;
        let n = (msg.len as usize).min(CAN_MAX_DLEN);

        let mut fdmsg = TPCANMsgFD {
            id: msg.id,
            msgtype: msg.msgtype,
            dlc: msg.len,
            ..TPCANMsgFD::default()
        };
        fdmsg.data[..n].copy_from_slice(&msg.data[..n]);
        Self(fdmsg)
    }
}

// ===== Parsing =====

/// Error parsing a frame from text
#[derive(Error, Debug)]
pub enum ParseError {
    /// The text does not have the `<id>#<data>` layout
    #[error("Invalid CAN frame")]
    InvalidCanFrame,
    /// The ID is not a hex number in the valid range
    #[error("Invalid CAN ID")]
    InvalidId,
    /// The data is not a sequence of hex byte values
    #[error("Invalid data: {0}")]
    InvalidData(#[from] hex::FromHexError),
    /// Error creating the frame
    #[error(transparent)]
    ConstructionError(#[from] ConstructionError),
}

impl FromStr for CanFdFrame {
    type Err = ParseError;

    /// Parses a frame in the compact `candump` notation:
    ///
    /// ```text
    ///   Data:   "<canid>#[data]"
    ///   Remote: "<canid>#R[len]"
    ///   CAN FD: "<canid>##<flags>[data]"
    /// ```
    ///
    /// An ID of more than three hex digits is always extended. For FD
    /// frames, flag bit 1 selects a bit rate switch.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id_str, data) = s.split_once('#').ok_or(ParseError::InvalidCanFrame)?;

        let raw = u32::from_str_radix(id_str, 16).map_err(|_| ParseError::InvalidId)?;
        let id = if id_str.len() > 3 {
            id_from_parts(raw, MessageType::EXTENDED)
        } else {
            id_from_raw(raw)
        }
        .ok_or(ParseError::InvalidId)?;

        if let Some(fd) = data.strip_prefix('#') {
            let flags = fd
                .get(0..1)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or(ParseError::InvalidCanFrame)?;
            let mut frame = Self::with_flags(id, &Vec::from_hex(&fd[1..])?, MessageType::empty())?;
            frame.set_brs(flags & 0x01 != 0);
            Ok(frame)
        } else if let Some(rlen) = data.strip_prefix('R') {
            let dlc = rlen.parse::<usize>().unwrap_or(0);
            Self::new_remote(id, dlc).ok_or(ParseError::ConstructionError(
                ConstructionError::TooMuchData,
            ))
        } else {
            let frame = CanFrame::with_type(id, &Vec::from_hex(data)?, MessageType::STANDARD)?;
            Ok(frame.into())
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
