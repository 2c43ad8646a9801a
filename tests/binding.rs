// pcanbasic/tests/binding.rs
//
// Integration tests for the driver binding and channel enumeration.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

mod common;

use common::{fake_pcan, FakeLoader};
use pcanbasic::{
    channel::LEGACY_HANDLES, enumerate_channels, ffi, Bitrate, BindError, PcanBasic, Session,
    Status,
};
use std::sync::Arc;

#[test]
fn unbound_driver_never_reaches_native_code() {
    let loader = FakeLoader::failing();
    let pcan = Arc::new(PcanBasic::with_loader(&loader));
    assert!(!pcan.is_bound());
    assert!(matches!(pcan.bind_error(), Some(BindError::MissingExport(_))));

    let mut session = Session::new(pcan.clone());
    assert_eq!(Status::UNKNOWN, session.connect(ffi::PCAN_USBBUS1, Bitrate::BAUD_500K));
    assert!(!session.is_connected());
    assert_eq!(Status::UNKNOWN, pcan.read_fd(ffi::PCAN_USBBUS1).0);
    assert_eq!(Status::UNKNOWN, pcan.uninitialize(ffi::PCAN_USBBUS1));

    // Malformed strings still report the unbound driver
    assert_eq!(Status::UNKNOWN, pcan.initialize_fd(ffi::PCAN_USBBUS1, "a\0b"));
    assert_eq!((Status::UNKNOWN, None), pcan.lookup_channel("a\0b"));

    let list = enumerate_channels(&pcan);
    assert_eq!(Some(Status::UNKNOWN), list.error);

    assert_eq!(1, loader.loads());
    assert!(loader.api.calls().is_empty());
}

#[test]
fn unbind_releases_once() {
    let (pcan, api) = fake_pcan();
    assert_eq!(Status::BUSLIGHT, pcan.get_status(ffi::PCAN_USBBUS1));
    pcan.unbind();
    pcan.unbind();

    assert_eq!(Status::UNKNOWN, pcan.reset(ffi::PCAN_USBBUS1));
    assert_eq!(vec!["get_status"], api.calls());
}

#[test]
fn failed_enumeration_keeps_legacy_channels() {
    let (pcan, api) = fake_pcan();
    api.attach(ffi::PCAN_USBBUS1, false, true);
    api.state.lock().attached_status = Status::ILLPARAMTYPE;

    let list = enumerate_channels(&pcan);
    assert_eq!(Some(Status::ILLPARAMTYPE), list.error);
    assert_eq!(LEGACY_HANDLES.len(), list.entries.len());
    assert_eq!(Some(LEGACY_HANDLES.len() - 1), list.selected);
    assert_eq!("PCAN_DNG 1 (31h)", list.selected_entry().unwrap().name);
}

#[test]
fn enumeration_lists_available_channels_last() {
    let (pcan, api) = fake_pcan();
    api.attach(ffi::PCAN_USBBUS1, false, true);
    api.attach(ffi::PCAN_USBBUS2, true, false);
    api.attach(ffi::PCAN_PCIBUS9, true, true);

    let list = enumerate_channels(&pcan);
    assert!(list.error.is_none());

    let names: Vec<_> = list.entries[LEGACY_HANDLES.len()..]
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(vec!["PCAN_USB 1 (51h)", "PCAN_PCI:FD 9 (409h)"], names);

    let sel = list.selected_entry().unwrap();
    assert_eq!(ffi::PCAN_PCIBUS9, sel.handle);
    assert!(sel.is_fd);
}

#[test]
fn enumeration_without_attached_channels() {
    let (pcan, _api) = fake_pcan();
    let list = enumerate_channels(&pcan);
    assert!(list.error.is_none());
    assert_eq!(LEGACY_HANDLES.len(), list.entries.len());
    assert_eq!("PCAN_ISA 1 (21h)", list.entries[0].name);
}
