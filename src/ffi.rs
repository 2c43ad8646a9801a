// pcanbasic/src/ffi.rs
//
// Raw types and constants of the PCAN-Basic C API.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Low-level PCAN-Basic definitions.
//!
//! These are binary compatible with the structures and values from the
//! vendor's `PCANBasic.h` header. Higher level code should normally use
//! the wrappers in [`frame`](crate::frame), [`errors`](crate::errors), and
//! [`driver`](crate::driver) rather than these directly.

#![allow(non_camel_case_types, missing_docs)]

use libc::c_char;
use std::mem;

/// A PCAN channel handle.
pub type Handle = u16;

// ===== Channel handles =====

/// Undefined/default value for a PCAN bus
pub const PCAN_NONEBUS: Handle = 0x00;

pub const PCAN_ISABUS1: Handle = 0x21;
pub const PCAN_ISABUS2: Handle = 0x22;
pub const PCAN_ISABUS3: Handle = 0x23;
pub const PCAN_ISABUS4: Handle = 0x24;
pub const PCAN_ISABUS5: Handle = 0x25;
pub const PCAN_ISABUS6: Handle = 0x26;
pub const PCAN_ISABUS7: Handle = 0x27;
pub const PCAN_ISABUS8: Handle = 0x28;

pub const PCAN_DNGBUS1: Handle = 0x31;

pub const PCAN_PCIBUS1: Handle = 0x41;
pub const PCAN_PCIBUS2: Handle = 0x42;
pub const PCAN_PCIBUS3: Handle = 0x43;
pub const PCAN_PCIBUS4: Handle = 0x44;
pub const PCAN_PCIBUS5: Handle = 0x45;
pub const PCAN_PCIBUS6: Handle = 0x46;
pub const PCAN_PCIBUS7: Handle = 0x47;
pub const PCAN_PCIBUS8: Handle = 0x48;
pub const PCAN_PCIBUS9: Handle = 0x409;
pub const PCAN_PCIBUS10: Handle = 0x40A;
pub const PCAN_PCIBUS11: Handle = 0x40B;
pub const PCAN_PCIBUS12: Handle = 0x40C;
pub const PCAN_PCIBUS13: Handle = 0x40D;
pub const PCAN_PCIBUS14: Handle = 0x40E;
pub const PCAN_PCIBUS15: Handle = 0x40F;
pub const PCAN_PCIBUS16: Handle = 0x410;

pub const PCAN_USBBUS1: Handle = 0x51;
pub const PCAN_USBBUS2: Handle = 0x52;
pub const PCAN_USBBUS3: Handle = 0x53;
pub const PCAN_USBBUS4: Handle = 0x54;
pub const PCAN_USBBUS5: Handle = 0x55;
pub const PCAN_USBBUS6: Handle = 0x56;
pub const PCAN_USBBUS7: Handle = 0x57;
pub const PCAN_USBBUS8: Handle = 0x58;
pub const PCAN_USBBUS9: Handle = 0x509;
pub const PCAN_USBBUS10: Handle = 0x50A;
pub const PCAN_USBBUS11: Handle = 0x50B;
pub const PCAN_USBBUS12: Handle = 0x50C;
pub const PCAN_USBBUS13: Handle = 0x50D;
pub const PCAN_USBBUS14: Handle = 0x50E;
pub const PCAN_USBBUS15: Handle = 0x50F;
pub const PCAN_USBBUS16: Handle = 0x510;

pub const PCAN_PCCBUS1: Handle = 0x61;
pub const PCAN_PCCBUS2: Handle = 0x62;

pub const PCAN_LANBUS1: Handle = 0x801;
pub const PCAN_LANBUS2: Handle = 0x802;
pub const PCAN_LANBUS3: Handle = 0x803;
pub const PCAN_LANBUS4: Handle = 0x804;
pub const PCAN_LANBUS5: Handle = 0x805;
pub const PCAN_LANBUS6: Handle = 0x806;
pub const PCAN_LANBUS7: Handle = 0x807;
pub const PCAN_LANBUS8: Handle = 0x808;
pub const PCAN_LANBUS9: Handle = 0x809;
pub const PCAN_LANBUS10: Handle = 0x80A;
pub const PCAN_LANBUS11: Handle = 0x80B;
pub const PCAN_LANBUS12: Handle = 0x80C;
pub const PCAN_LANBUS13: Handle = 0x80D;
pub const PCAN_LANBUS14: Handle = 0x80E;
pub const PCAN_LANBUS15: Handle = 0x80F;
pub const PCAN_LANBUS16: Handle = 0x810;

// ===== Status codes =====

pub const PCAN_ERROR_OK: u32 = 0x00000;
pub const PCAN_ERROR_XMTFULL: u32 = 0x00001;
pub const PCAN_ERROR_OVERRUN: u32 = 0x00002;
pub const PCAN_ERROR_BUSLIGHT: u32 = 0x00004;
pub const PCAN_ERROR_BUSHEAVY: u32 = 0x00008;
pub const PCAN_ERROR_BUSWARNING: u32 = PCAN_ERROR_BUSHEAVY;
pub const PCAN_ERROR_BUSPASSIVE: u32 = 0x40000;
pub const PCAN_ERROR_BUSOFF: u32 = 0x00010;
pub const PCAN_ERROR_ANYBUSERR: u32 = PCAN_ERROR_BUSWARNING
    | PCAN_ERROR_BUSLIGHT
    | PCAN_ERROR_BUSHEAVY
    | PCAN_ERROR_BUSOFF
    | PCAN_ERROR_BUSPASSIVE;
pub const PCAN_ERROR_QRCVEMPTY: u32 = 0x00020;
pub const PCAN_ERROR_QOVERRUN: u32 = 0x00040;
pub const PCAN_ERROR_QXMTFULL: u32 = 0x00080;
pub const PCAN_ERROR_REGTEST: u32 = 0x00100;
pub const PCAN_ERROR_NODRIVER: u32 = 0x00200;
pub const PCAN_ERROR_HWINUSE: u32 = 0x00400;
pub const PCAN_ERROR_NETINUSE: u32 = 0x00800;
pub const PCAN_ERROR_ILLHW: u32 = 0x01400;
pub const PCAN_ERROR_ILLNET: u32 = 0x01800;
pub const PCAN_ERROR_ILLCLIENT: u32 = 0x01C00;
pub const PCAN_ERROR_ILLHANDLE: u32 =
    PCAN_ERROR_ILLHW | PCAN_ERROR_ILLNET | PCAN_ERROR_ILLCLIENT;
pub const PCAN_ERROR_RESOURCE: u32 = 0x02000;
pub const PCAN_ERROR_ILLPARAMTYPE: u32 = 0x04000;
pub const PCAN_ERROR_ILLPARAMVAL: u32 = 0x08000;
pub const PCAN_ERROR_UNKNOWN: u32 = 0x10000;
pub const PCAN_ERROR_ILLDATA: u32 = 0x20000;
pub const PCAN_ERROR_ILLMODE: u32 = 0x80000;
pub const PCAN_ERROR_CAUTION: u32 = 0x2000000;
pub const PCAN_ERROR_INITIALIZE: u32 = 0x4000000;
pub const PCAN_ERROR_ILLOPERATION: u32 = 0x8000000;

// ===== Message types =====

pub const PCAN_MESSAGE_STANDARD: u8 = 0x00;
pub const PCAN_MESSAGE_RTR: u8 = 0x01;
pub const PCAN_MESSAGE_EXTENDED: u8 = 0x02;
pub const PCAN_MESSAGE_FD: u8 = 0x04;
pub const PCAN_MESSAGE_BRS: u8 = 0x08;
pub const PCAN_MESSAGE_ESI: u8 = 0x10;
pub const PCAN_MESSAGE_ECHO: u8 = 0x20;
pub const PCAN_MESSAGE_ERRFRAME: u8 = 0x40;
pub const PCAN_MESSAGE_STATUS: u8 = 0x80;

// ===== Parameter values =====

pub const PCAN_PARAMETER_OFF: u32 = 0x00;
pub const PCAN_PARAMETER_ON: u32 = 0x01;
pub const PCAN_FILTER_CLOSE: u32 = 0x00;
pub const PCAN_FILTER_OPEN: u32 = 0x01;
pub const PCAN_FILTER_CUSTOM: u32 = 0x02;

pub const PCAN_CHANNEL_UNAVAILABLE: u32 = 0x00;
pub const PCAN_CHANNEL_AVAILABLE: u32 = 0x01;
pub const PCAN_CHANNEL_OCCUPIED: u32 = 0x02;
pub const PCAN_CHANNEL_PCANVIEW: u32 = PCAN_CHANNEL_AVAILABLE | PCAN_CHANNEL_OCCUPIED;

pub const FEATURE_FD_CAPABLE: u32 = 0x01;
pub const FEATURE_DELAY_CAPABLE: u32 = 0x02;
pub const FEATURE_IO_CAPABLE: u32 = 0x04;

pub const PCAN_MODE_STANDARD: u8 = PCAN_MESSAGE_STANDARD;
pub const PCAN_MODE_EXTENDED: u8 = PCAN_MESSAGE_EXTENDED;

/// Maximum length of a device name in `TPCANChannelInformation`
pub const MAX_LENGTH_HARDWARE_NAME: usize = 33;

/// Size of the buffer the driver fills in `CAN_GetErrorText`
pub const MAX_LENGTH_ERROR_TEXT: usize = 256;

/// Size of the buffer used for string parameters
pub const MAX_LENGTH_VERSION_STRING: usize = 256;

/// Maximum data length of a classic frame
pub const CAN_MAX_DLEN: usize = 8;

/// Maximum data length of an FD frame
pub const CANFD_MAX_DLEN: usize = 64;

// ===== Structures =====

/// A classic CAN message
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TPCANMsg {
    /// 11/29-bit message identifier
    pub id: u32,
    /// Type of the message
    pub msgtype: u8,
    /// Data length code of the message (0..8)
    pub len: u8,
    /// Data of the message
    pub data: [u8; CAN_MAX_DLEN],
}

/// Receive timestamp of a classic message
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TPCANTimestamp {
    /// Base value
    pub millis: u32,
    /// Roll-arounds of millis
    pub millis_overflow: u16,
    /// Microseconds: 0..999
    pub micros: u16,
}

/// A CAN FD message
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TPCANMsgFD {
    /// 11/29-bit message identifier
    pub id: u32,
    /// Type of the message
    pub msgtype: u8,
    /// Data length code of the message (0..15)
    pub dlc: u8,
    /// Data of the message
    pub data: [u8; CANFD_MAX_DLEN],
}

impl Default for TPCANMsgFD {
    fn default() -> Self {
        Self {
            id: 0,
            msgtype: 0,
            dlc: 0,
            data: [0; CANFD_MAX_DLEN],
        }
    }
}

/// Receive timestamp of an FD message, in microseconds
pub type TPCANTimestampFD = u64;

/// Information about an attached channel, as returned by the
/// `PCAN_ATTACHED_CHANNELS` parameter.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TPCANChannelInformation {
    pub channel_handle: Handle,
    pub device_type: u8,
    pub controller_number: u8,
    pub device_features: u32,
    pub device_name: [c_char; MAX_LENGTH_HARDWARE_NAME],
    pub device_id: u32,
    pub channel_condition: u32,
}

impl Default for TPCANChannelInformation {
    fn default() -> Self {
        // All-zero is a valid bit pattern for every field.
        unsafe { mem::zeroed() }
    }
}

// ===== Exported function signatures =====

pub type CAN_Initialize = unsafe extern "system" fn(Handle, u16, u8, u32, u16) -> u32;
pub type CAN_InitializeFD = unsafe extern "system" fn(Handle, *mut c_char) -> u32;
pub type CAN_Uninitialize = unsafe extern "system" fn(Handle) -> u32;
pub type CAN_Reset = unsafe extern "system" fn(Handle) -> u32;
pub type CAN_GetStatus = unsafe extern "system" fn(Handle) -> u32;
pub type CAN_Read = unsafe extern "system" fn(Handle, *mut TPCANMsg, *mut TPCANTimestamp) -> u32;
pub type CAN_ReadFD =
    unsafe extern "system" fn(Handle, *mut TPCANMsgFD, *mut TPCANTimestampFD) -> u32;
pub type CAN_Write = unsafe extern "system" fn(Handle, *mut TPCANMsg) -> u32;
pub type CAN_WriteFD = unsafe extern "system" fn(Handle, *mut TPCANMsgFD) -> u32;
pub type CAN_FilterMessages = unsafe extern "system" fn(Handle, u32, u32, u8) -> u32;
pub type CAN_GetValue = unsafe extern "system" fn(Handle, u8, *mut libc::c_void, u32) -> u32;
pub type CAN_SetValue = unsafe extern "system" fn(Handle, u8, *mut libc::c_void, u32) -> u32;
pub type CAN_GetErrorText = unsafe extern "system" fn(u32, u16, *mut c_char) -> u32;
pub type CAN_LookUpChannel = unsafe extern "system" fn(*mut c_char, *mut Handle) -> u32;
