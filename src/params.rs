// pcanbasic/src/params.rs
//
// Typed configuration values passed to the PCAN-Basic driver.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Bit rates, hardware types, parameter IDs, and language codes.
//!
//! These are thin newtypes over the numeric values the driver expects, so
//! any value the driver accepts can still be expressed, while the common
//! ones have names.

use std::fmt;

// ===== Bitrate =====

/// A classic CAN bit rate, as a BTR0/BTR1 register code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Bitrate(pub u16);

impl Bitrate {
    /// 1 MBit/s
    pub const BAUD_1M: Self = Self(0x0014);
    /// 800 kBit/s
    pub const BAUD_800K: Self = Self(0x0016);
    /// 500 kBit/s
    pub const BAUD_500K: Self = Self(0x001C);
    /// 250 kBit/s
    pub const BAUD_250K: Self = Self(0x011C);
    /// 125 kBit/s
    pub const BAUD_125K: Self = Self(0x031C);
    /// 100 kBit/s
    pub const BAUD_100K: Self = Self(0x432F);
    /// 95,238 kBit/s
    pub const BAUD_95K: Self = Self(0xC34E);
    /// 83,333 kBit/s
    pub const BAUD_83K: Self = Self(0x852B);
    /// 50 kBit/s
    pub const BAUD_50K: Self = Self(0x472F);
    /// 47,619 kBit/s
    pub const BAUD_47K: Self = Self(0x1414);
    /// 33,333 kBit/s
    pub const BAUD_33K: Self = Self(0x8B2F);
    /// 20 kBit/s
    pub const BAUD_20K: Self = Self(0x532F);
    /// 10 kBit/s
    pub const BAUD_10K: Self = Self(0x672F);
    /// 5 kBit/s
    pub const BAUD_5K: Self = Self(0x7F7F);

    const NAMED: [(&'static str, Self); 14] = [
        ("1M", Self::BAUD_1M),
        ("800K", Self::BAUD_800K),
        ("500K", Self::BAUD_500K),
        ("250K", Self::BAUD_250K),
        ("125K", Self::BAUD_125K),
        ("100K", Self::BAUD_100K),
        ("95K", Self::BAUD_95K),
        ("83K", Self::BAUD_83K),
        ("50K", Self::BAUD_50K),
        ("47K", Self::BAUD_47K),
        ("33K", Self::BAUD_33K),
        ("20K", Self::BAUD_20K),
        ("10K", Self::BAUD_10K),
        ("5K", Self::BAUD_5K),
    ];

    /// Looks up a bit rate by a short name like "500k" or "1M".
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_uppercase();
        Self::NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, rate)| *rate)
    }
}

impl Default for Bitrate {
    fn default() -> Self {
        Self::BAUD_500K
    }
}

/// The FD bit rate string used when none is given.
pub const DEFAULT_FD_BITRATE: &str = "f_clock_mhz=20, nom_brp=5, nom_tseg1=2, nom_tseg2=1, \
    nom_sjw=1, data_brp=2, data_tseg1=3, data_tseg2=1, data_sjw=1";

// ===== HardwareType =====

/// The type of a non-plug-and-play (ISA or Dongle) adapter.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HardwareType(pub u8);

impl HardwareType {
    /// PCAN-ISA 82C200
    pub const ISA: Self = Self(0x01);
    /// PCAN-ISA SJA1000
    pub const ISA_SJA: Self = Self(0x09);
    /// PHYTEC ISA
    pub const ISA_PHYTEC: Self = Self(0x04);
    /// PCAN-Dongle 82C200
    pub const DNG: Self = Self(0x02);
    /// PCAN-Dongle EPP 82C200
    pub const DNG_EPP: Self = Self(0x03);
    /// PCAN-Dongle SJA1000
    pub const DNG_SJA: Self = Self(0x05);
    /// PCAN-Dongle EPP SJA1000
    pub const DNG_SJA_EPP: Self = Self(0x06);
}

// ===== Parameter =====

/// The ID of a value read or written with `CAN_GetValue`/`CAN_SetValue`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Parameter(pub u8);

impl Parameter {
    /// Device identifier of a PCAN-USB or FD device
    pub const DEVICE_ID: Self = Self(0x01);
    /// 5-Volt power on connector 1 of a PCAN-PC Card
    pub const FIVE_VOLTS_POWER: Self = Self(0x02);
    /// Event for receiving frames
    pub const RECEIVE_EVENT: Self = Self(0x03);
    /// State of the message filter
    pub const MESSAGE_FILTER: Self = Self(0x04);
    /// Version of the PCAN-Basic API
    pub const API_VERSION: Self = Self(0x05);
    /// Version of the channel's driver
    pub const CHANNEL_VERSION: Self = Self(0x06);
    /// Reset the controller automatically on bus-off
    pub const BUSOFF_AUTORESET: Self = Self(0x07);
    /// Listen-only mode
    pub const LISTEN_ONLY: Self = Self(0x08);
    /// Directory of the log file
    pub const LOG_LOCATION: Self = Self(0x09);
    /// Debug-logging status
    pub const LOG_STATUS: Self = Self(0x0A);
    /// Log configuration
    pub const LOG_CONFIGURE: Self = Self(0x0B);
    /// Custom text written to the log
    pub const LOG_TEXT: Self = Self(0x0C);
    /// Availability of a channel
    pub const CHANNEL_CONDITION: Self = Self(0x0D);
    /// Hardware name of a channel
    pub const HARDWARE_NAME: Self = Self(0x0E);
    /// Receive status of a channel
    pub const RECEIVE_STATUS: Self = Self(0x0F);
    /// Controller number of a channel
    pub const CONTROLLER_NUMBER: Self = Self(0x10);
    /// Tracing location
    pub const TRACE_LOCATION: Self = Self(0x11);
    /// Tracing status
    pub const TRACE_STATUS: Self = Self(0x12);
    /// Trace file size in MB
    pub const TRACE_SIZE: Self = Self(0x13);
    /// Trace configuration
    pub const TRACE_CONFIGURE: Self = Self(0x14);
    /// Identify a USB channel by blinking its LED
    pub const CHANNEL_IDENTIFYING: Self = Self(0x15);
    /// Features supported by a channel
    pub const CHANNEL_FEATURES: Self = Self(0x16);
    /// Bit rate adaptation on initialization
    pub const BITRATE_ADAPTING: Self = Self(0x17);
    /// Bit rate as BTR0/BTR1 value
    pub const BITRATE_INFO: Self = Self(0x18);
    /// FD bit rate as string
    pub const BITRATE_INFO_FD: Self = Self(0x19);
    /// Nominal bus speed in bit/s
    pub const BUSSPEED_NOMINAL: Self = Self(0x1A);
    /// Data bus speed in bit/s
    pub const BUSSPEED_DATA: Self = Self(0x1B);
    /// Remote address of a LAN channel
    pub const IP_ADDRESS: Self = Self(0x1C);
    /// Status of the LAN service
    pub const LAN_SERVICE_STATUS: Self = Self(0x1D);
    /// Receive status frames
    pub const ALLOW_STATUS_FRAMES: Self = Self(0x1E);
    /// Receive RTR frames
    pub const ALLOW_RTR_FRAMES: Self = Self(0x1F);
    /// Receive error frames
    pub const ALLOW_ERROR_FRAMES: Self = Self(0x20);
    /// Delay between frames, in microseconds
    pub const INTERFRAME_DELAY: Self = Self(0x21);
    /// Acceptance filter for 11-bit frames
    pub const ACCEPTANCE_FILTER_11BIT: Self = Self(0x22);
    /// Acceptance filter for 29-bit frames
    pub const ACCEPTANCE_FILTER_29BIT: Self = Self(0x23);
    /// Digital I/O pin configuration
    pub const IO_DIGITAL_CONFIGURATION: Self = Self(0x24);
    /// Digital I/O pin value
    pub const IO_DIGITAL_VALUE: Self = Self(0x25);
    /// Set digital I/O pins
    pub const IO_DIGITAL_SET: Self = Self(0x26);
    /// Clear digital I/O pins
    pub const IO_DIGITAL_CLEAR: Self = Self(0x27);
    /// Analog input value
    pub const IO_ANALOG_VALUE: Self = Self(0x28);
    /// Firmware version of the device
    pub const FIRMWARE_VERSION: Self = Self(0x29);
    /// Number of attached channels
    pub const ATTACHED_CHANNELS_COUNT: Self = Self(0x2A);
    /// Information about the attached channels
    pub const ATTACHED_CHANNELS: Self = Self(0x2B);
    /// Echo transmitted frames back to the receive queue
    pub const ALLOW_ECHO_FRAMES: Self = Self(0x2C);
    /// Part number of the device
    pub const DEVICE_PART_NUMBER: Self = Self(0x2D);
}

// ===== Language =====

/// The language of text returned by `CAN_GetErrorText`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Language(pub u16);

impl Language {
    /// The system default language
    pub const NEUTRAL: Self = Self(0x00);
    /// German
    pub const GERMAN: Self = Self(0x07);
    /// English
    pub const ENGLISH: Self = Self(0x09);
    /// Spanish
    pub const SPANISH: Self = Self(0x0A);
    /// French
    pub const FRENCH: Self = Self(0x0C);
    /// Italian
    pub const ITALIAN: Self = Self(0x10);
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match Self::NAMED.iter().find(|(_, rate)| rate == self) {
            Some((name, _)) => write!(f, "{} bit/s", name),
            None => write!(f, "BTR0BTR1 {:04X}h", self.0),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
