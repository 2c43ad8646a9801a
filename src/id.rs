// pcanbasic/src/id.rs
//
// Implements CANbus identifiers and PCAN message type flags.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CANbus identifiers and the PCAN message type bitmask.
//!
//! Unlike SocketCAN, PCAN-Basic keeps the identifier and the frame flags in
//! separate fields. The identifier is a plain 11 or 29-bit number, and the
//! `MSGTYPE` byte carries a set of orthogonal flags describing the frame.

use crate::ffi;
use bitflags::bitflags;
use embedded_can::{ExtendedId, Id, StandardId};

/// Valid bits in a standard (11-bit) identifier
pub const CAN_SFF_MASK: u32 = 0x0000_07FF;

/// Valid bits in an extended (29-bit) identifier
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

bitflags! {
    /// The PCAN `MSGTYPE` bitmask of a frame.
    ///
    /// A standard data frame has no bits set.
    #[repr(transparent)]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MessageType: u8 {
        /// Remote transmission request
        const RTR = ffi::PCAN_MESSAGE_RTR;
        /// 29-bit extended identifier
        const EXTENDED = ffi::PCAN_MESSAGE_EXTENDED;
        /// CAN FD frame
        const FD = ffi::PCAN_MESSAGE_FD;
        /// Bit rate switch (second bit rate for payload data)
        const BRS = ffi::PCAN_MESSAGE_BRS;
        /// Error state indicator of the transmitting node
        const ESI = ffi::PCAN_MESSAGE_ESI;
        /// Frame echoed back by the driver after transmission
        const ECHO = ffi::PCAN_MESSAGE_ECHO;
        /// Error frame
        const ERRFRAME = ffi::PCAN_MESSAGE_ERRFRAME;
        /// Status information from the hardware
        const STATUS = ffi::PCAN_MESSAGE_STATUS;
    }
}

impl MessageType {
    /// A standard, 11-bit, data frame.
    pub const STANDARD: Self = Self::empty();

    /// The message type for a data frame carrying the given ID.
    pub fn for_id(id: &Id) -> Self {
        if id_is_extended(id) {
            Self::EXTENDED
        } else {
            Self::STANDARD
        }
    }
}

/// Determines if the ID is an extended, 29-bit, ID.
#[inline]
pub fn id_is_extended(id: &Id) -> bool {
    matches!(id, Id::Extended(_))
}

/// Gets the raw numeric value of an ID.
pub fn id_to_raw(id: impl Into<Id>) -> u32 {
    match id.into() {
        Id::Standard(id) => id.as_raw() as u32,
        Id::Extended(id) => id.as_raw(),
    }
}

/// Creates a CAN ID from a raw integer value.
///
/// If the `id` is <= 0x7FF, it's assumed to be a standard ID, otherwise
/// it is created as an Extended ID. If you require an Extended ID <= 0x7FF,
/// use [`id_from_parts`].
pub fn id_from_raw(id: u32) -> Option<Id> {
    let id = match id {
        n if n <= CAN_SFF_MASK => StandardId::new(n as u16)?.into(),
        n => ExtendedId::new(n)?.into(),
    };
    Some(id)
}

/// Creates a CAN ID from the raw value and the message type of a frame.
pub fn id_from_parts(id: u32, msgtype: MessageType) -> Option<Id> {
    if msgtype.contains(MessageType::EXTENDED) {
        ExtendedId::new(id).map(Id::from)
    } else {
        StandardId::new(u16::try_from(id).ok()?).map(Id::from)
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_bits() {
        let mut flags = MessageType::EXTENDED | MessageType::FD;
        assert_eq!(0x06, flags.bits());

        flags.set(MessageType::BRS, true);
        assert_eq!(0x0E, flags.bits());
        assert!(MessageType::STANDARD.is_empty());
    }

    #[test]
    fn test_id_from_raw() {
        assert!(matches!(id_from_raw(0x100), Some(Id::Standard(_))));
        assert!(matches!(id_from_raw(0x800), Some(Id::Extended(_))));
        assert!(id_from_raw(0x2000_0000).is_none());
    }

    #[test]
    fn test_id_from_parts() {
        let id = id_from_parts(0x7FF, MessageType::EXTENDED).unwrap();
        assert!(id_is_extended(&id));
        assert_eq!(0x7FF, id_to_raw(id));

        assert!(id_from_parts(0x800, MessageType::STANDARD).is_none());
        assert_eq!(MessageType::EXTENDED, MessageType::for_id(&id));
    }
}
