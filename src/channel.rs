// pcanbasic/src/channel.rs
//
// Enumeration and naming of PCAN channels.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Channel enumeration.
//!
//! Legacy ISA and Dongle adapters can't be detected, so their fixed handles
//! are always offered. Plug-and-play hardware (USB, PCI, LAN, ...) is
//! queried from the driver, and only channels that are currently available
//! are listed.

use crate::{
    ffi::{self, Handle, TPCANChannelInformation},
    params::Parameter,
    PcanBasic, Status,
};
use log::debug;
use std::{ffi::CStr, fmt, mem::size_of, ptr};

/// The handles of the non-plug-and-play channels.
pub const LEGACY_HANDLES: [Handle; 9] = [
    ffi::PCAN_ISABUS1,
    ffi::PCAN_ISABUS2,
    ffi::PCAN_ISABUS3,
    ffi::PCAN_ISABUS4,
    ffi::PCAN_ISABUS5,
    ffi::PCAN_ISABUS6,
    ffi::PCAN_ISABUS7,
    ffi::PCAN_ISABUS8,
    ffi::PCAN_DNGBUS1,
];

/// Gets the name of the device family that a handle belongs to.
pub fn device_family(handle: Handle) -> &'static str {
    match handle {
        ffi::PCAN_ISABUS1..=ffi::PCAN_ISABUS8 => "PCAN_ISA",
        ffi::PCAN_DNGBUS1 => "PCAN_DNG",
        ffi::PCAN_PCIBUS1..=ffi::PCAN_PCIBUS8 | ffi::PCAN_PCIBUS9..=ffi::PCAN_PCIBUS16 => {
            "PCAN_PCI"
        }
        ffi::PCAN_USBBUS1..=ffi::PCAN_USBBUS8 | ffi::PCAN_USBBUS9..=ffi::PCAN_USBBUS16 => {
            "PCAN_USB"
        }
        ffi::PCAN_PCCBUS1..=ffi::PCAN_PCCBUS2 => "PCAN_PCC",
        ffi::PCAN_LANBUS1..=ffi::PCAN_LANBUS16 => "PCAN_LAN",
        _ => "PCAN_NONE",
    }
}

/// Gets the 1-based number of the channel within its device family.
///
/// Handles below 0x100 keep the number in the low nibble, the others in
/// the low byte.
pub fn channel_number(handle: Handle) -> u8 {
    if handle < 0x100 {
        (handle & 0x0F) as u8
    } else {
        (handle & 0xFF) as u8
    }
}

/// Formats a handle for display, like `PCAN_USB 1 (51h)` or
/// `PCAN_USB:FD 9 (509h)`.
pub fn format_channel_name(handle: Handle, is_fd: bool) -> String {
    let family = device_family(handle);
    let fd = if is_fd { ":FD" } else { "" };
    format!("{}{} {} ({:X}h)", family, fd, channel_number(handle), handle)
}

// ===== AttachedChannel =====

/// A plug-and-play channel reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedChannel {
    /// The handle used to open the channel
    pub handle: Handle,
    /// The kind of device
    pub device_type: u8,
    /// The controller number within the device
    pub controller_number: u8,
    /// `FEATURE_*` bits
    pub features: u32,
    /// The product name of the device
    pub device_name: String,
    /// The user-assigned device ID
    pub device_id: u32,
    /// `PCAN_CHANNEL_*` condition
    pub condition: u32,
}

impl AttachedChannel {
    /// Whether the channel can be opened right now.
    pub fn is_available(&self) -> bool {
        self.condition & ffi::PCAN_CHANNEL_AVAILABLE != 0
    }

    /// Whether the channel supports CAN FD.
    pub fn is_fd_capable(&self) -> bool {
        self.features & ffi::FEATURE_FD_CAPABLE != 0
    }
}

impl From<&TPCANChannelInformation> for AttachedChannel {
    fn from(info: &TPCANChannelInformation) -> Self {
        let mut name = info.device_name;
        name[ffi::MAX_LENGTH_HARDWARE_NAME - 1] = 0;
        let device_name = unsafe { CStr::from_ptr(name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        Self {
            handle: info.channel_handle,
            device_type: info.device_type,
            controller_number: info.controller_number,
            features: info.device_features,
            device_name,
            device_id: info.device_id,
            condition: info.channel_condition,
        }
    }
}

/// Unpacks the channel records from a `PCAN_ATTACHED_CHANNELS` buffer.
fn parse_channel_info(buf: &[u8]) -> Vec<AttachedChannel> {
    buf.chunks_exact(size_of::<TPCANChannelInformation>())
        .map(|chunk| {
            // The buffer has no alignment guarantee
            let info: TPCANChannelInformation =
                unsafe { ptr::read_unaligned(chunk.as_ptr() as *const _) };
            AttachedChannel::from(&info)
        })
        .collect()
}

/// Queries the driver for the attached plug-and-play channels.
pub fn attached_channels(pcan: &PcanBasic) -> (Status, Vec<AttachedChannel>) {
    let (sts, count) = pcan.get_u32(ffi::PCAN_NONEBUS, Parameter::ATTACHED_CHANNELS_COUNT);
    if !sts.is_ok() {
        return (sts, vec![]);
    }
    if count == 0 {
        return (sts, vec![]);
    }

    let size = count as usize * size_of::<TPCANChannelInformation>();
    let (sts, buf) = pcan.get_value(ffi::PCAN_NONEBUS, Parameter::ATTACHED_CHANNELS, size);
    if !sts.is_ok() {
        return (sts, vec![]);
    }
    (sts, parse_channel_info(&buf))
}

// ===== ChannelList =====

/// A channel offered for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    /// The channel handle
    pub handle: Handle,
    /// Whether the channel supports CAN FD
    pub is_fd: bool,
    /// The display name
    pub name: String,
}

impl ChannelEntry {
    /// Creates an entry, formatting its display name.
    pub fn new(handle: Handle, is_fd: bool) -> Self {
        Self {
            handle,
            is_fd,
            name: format_channel_name(handle, is_fd),
        }
    }
}

impl fmt::Display for ChannelEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The result of a channel enumeration.
#[derive(Debug, Clone, Default)]
pub struct ChannelList {
    /// Legacy handles first, then the available plug-and-play channels
    pub entries: Vec<ChannelEntry>,
    /// The index of the default selection: the last entry
    pub selected: Option<usize>,
    /// Set if the driver could not be queried for attached channels
    pub error: Option<Status>,
}

impl ChannelList {
    /// Gets the entry selected by default.
    pub fn selected_entry(&self) -> Option<&ChannelEntry> {
        self.selected.and_then(|i| self.entries.get(i))
    }
}

/// Builds the list of channels that can be opened.
///
/// A failure to query the driver still yields the legacy channels, with
/// the status recorded in [`ChannelList::error`].
pub fn enumerate_channels(pcan: &PcanBasic) -> ChannelList {
    let mut entries: Vec<ChannelEntry> = LEGACY_HANDLES
        .iter()
        .map(|&h| ChannelEntry::new(h, false))
        .collect();

    let (sts, attached) = attached_channels(pcan);
    let error = if sts.is_ok() { None } else { Some(sts) };

    entries.extend(
        attached
            .iter()
            .filter(|ch| ch.is_available())
            .map(|ch| ChannelEntry::new(ch.handle, ch.is_fd_capable())),
    );
    debug!(
        "Enumerated {} channels ({} attached)",
        entries.len(),
        attached.len()
    );

    ChannelList {
        selected: entries.len().checked_sub(1),
        entries,
        error,
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use libc::c_char;

    #[test]
    fn test_families() {
        assert_eq!("PCAN_ISA", device_family(ffi::PCAN_ISABUS3));
        assert_eq!("PCAN_DNG", device_family(ffi::PCAN_DNGBUS1));
        assert_eq!("PCAN_PCI", device_family(0x410));
        assert_eq!("PCAN_USB", device_family(0x55));
        assert_eq!("PCAN_PCC", device_family(ffi::PCAN_PCCBUS2));
        assert_eq!("PCAN_LAN", device_family(0x80A));
        assert_eq!("PCAN_NONE", device_family(0x99));
    }

    #[test]
    fn test_format_names() {
        assert_eq!("PCAN_ISA 1 (21h)", format_channel_name(ffi::PCAN_ISABUS1, false));
        assert_eq!("PCAN_USB:FD 1 (51h)", format_channel_name(ffi::PCAN_USBBUS1, true));
        assert_eq!("PCAN_USB 9 (509h)", format_channel_name(ffi::PCAN_USBBUS9, false));
        assert_eq!("PCAN_LAN 16 (810h)", format_channel_name(ffi::PCAN_LANBUS16, false));
    }

    #[test]
    fn test_parse_channel_info() {
        let mut info = TPCANChannelInformation {
            channel_handle: ffi::PCAN_USBBUS2,
            device_type: 5,
            controller_number: 1,
            device_features: ffi::FEATURE_FD_CAPABLE,
            device_id: 7,
            channel_condition: ffi::PCAN_CHANNEL_AVAILABLE,
            ..TPCANChannelInformation::default()
        };
        for (dst, src) in info.device_name.iter_mut().zip(b"PCAN-USB FD") {
            *dst = *src as c_char;
        }

        let n = size_of::<TPCANChannelInformation>();
        let mut buf = vec![0u8; 2 * n + 1];
        unsafe {
            ptr::write_unaligned(buf[1..].as_mut_ptr() as *mut TPCANChannelInformation, info);
        }

        let channels = parse_channel_info(&buf[1..]);
        assert_eq!(2, channels.len());
        assert_eq!(ffi::PCAN_USBBUS2, channels[0].handle);
        assert_eq!("PCAN-USB FD", channels[0].device_name);
        assert!(channels[0].is_available());
        assert!(channels[0].is_fd_capable());
        assert!(!channels[1].is_available());
    }
}
