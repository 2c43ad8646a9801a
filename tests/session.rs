// pcanbasic/tests/session.rs
//
// Integration tests for channel sessions.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

mod common;

use common::{fake_pcan, FakeApi};
use pcanbasic::{
    ffi, id::id_from_raw, Bitrate, CanFdFrame, CanFrame, EmbeddedFrame, FilterConfig,
    FilterState, ReadMode, ReaderConfig, Session, Status,
};
use std::{thread, time::Duration};

const CH: u16 = ffi::PCAN_USBBUS1;

fn manual_session() -> (Session, FakeApi) {
    let (pcan, api) = fake_pcan();
    let mut session = Session::new(pcan);
    session.set_read_mode(ReadMode::Manual).unwrap();
    (session, api)
}

#[test]
fn caution_on_connect_is_success() {
    let (mut session, api) = manual_session();
    api.state.lock().init_status = Status::CAUTION;

    assert_eq!(Status::OK, session.connect(CH, Bitrate::BAUD_250K));
    assert!(session.is_connected());
    assert_eq!(Some(CH), session.channel());
    assert!(!session.is_fd());
}

#[test]
fn failed_connect_leaves_nothing_running() {
    let (pcan, api) = fake_pcan();
    let mut session = Session::new(pcan);
    api.state.lock().init_status = Status::ILLHW;

    assert_eq!(Status::ILLHW, session.connect(CH, Bitrate::BAUD_500K));
    assert!(!session.is_connected());

    thread::sleep(Duration::from_millis(20));
    assert_eq!(0, api.count("read"));
    assert_eq!(Status::INITIALIZE, session.release());
}

#[test]
fn release_stops_reading_before_uninitialize() {
    let (pcan, api) = fake_pcan();
    let config = ReaderConfig::default().read_interval(Duration::from_millis(2));
    let mut session = Session::with_config(pcan, config);

    assert!(session.connect_fd(CH, "f_clock_mhz=20").is_ok());
    assert!(session.is_fd());
    thread::sleep(Duration::from_millis(20));
    assert!(api.count("read_fd") > 0);

    assert!(session.release().is_ok());
    assert!(!session.is_connected());
    assert_eq!(Some(&"uninitialize"), api.calls().last());

    thread::sleep(Duration::from_millis(10));
    assert_eq!(Some(&"uninitialize"), api.calls().last());
}

#[test]
fn reconnect_releases_the_old_channel() {
    let (mut session, api) = manual_session();
    session.connect(CH, Bitrate::BAUD_500K);
    session.connect(ffi::PCAN_USBBUS2, Bitrate::BAUD_500K);

    assert_eq!(
        vec!["initialize", "uninitialize", "initialize"],
        api.calls()
    );
    assert_eq!(Some(ffi::PCAN_USBBUS2), session.channel());
}

#[test]
fn dropping_the_session_releases() {
    let (mut session, api) = manual_session();
    session.connect(CH, Bitrate::BAUD_500K);
    drop(session);
    assert_eq!(1, api.count("uninitialize"));
}

#[test]
fn calls_need_a_connection() {
    let (session, api) = manual_session();
    let frame = CanFrame::new(id_from_raw(0x100).unwrap(), &[1]).unwrap();

    assert_eq!(Status::INITIALIZE, session.write(&frame));
    assert_eq!(Status::INITIALIZE, session.read_manual());
    assert_eq!(Status::INITIALIZE, session.get_status());
    assert_eq!(Status::INITIALIZE, session.configure_filter(FilterConfig::Open));
    assert_eq!((Status::INITIALIZE, None), session.query_filter());
    assert!(api.calls().is_empty());
}

#[test]
fn manual_reads_show_up_on_the_next_tick() {
    let (mut session, api) = manual_session();
    session.connect(CH, Bitrate::BAUD_500K);
    api.push_rx(0x100, 0, &[1, 2], 1000);
    api.push_rx(0x100, 0, &[3, 4], 1500);

    assert!(session.read_manual().is_ok());
    let tick = session.display_tick();
    assert_eq!(1, tick.len());
    assert_eq!("100h", tick[0].id_string());
    assert!(session.display_tick().is_empty());

    assert!(session.read_manual().is_ok());
    let tick = session.display_tick();
    assert_eq!(2, tick[0].count());
    assert_eq!(" 03 04", tick[0].data_string());

    assert!(session.read_manual().is_queue_empty());
}

#[test]
fn period_mode_redraws_changed_rows() {
    let (mut session, api) = manual_session();
    session.connect(CH, Bitrate::BAUD_500K);
    api.push_rx(0x100, 0, &[], 1000);
    api.push_rx(0x200, 0, &[], 1000);
    session.read_manual();
    session.read_manual();
    session.display_tick();

    session.set_show_period(true);
    let tick = session.display_tick();
    assert_eq!(2, tick.len());
    assert!(tick.iter().all(|rec| rec.show_period()));

    session.clear();
    assert!(session.tracker().is_empty());
}

#[test]
fn writes_reach_the_driver() {
    let (mut session, api) = manual_session();
    session.connect(CH, Bitrate::BAUD_500K);

    let frame: CanFdFrame = "123#DEADBEEF".parse().unwrap();
    let frame = CanFrame::try_from(frame).unwrap();
    assert!(session.write(&frame).is_ok());

    let written = api.state.lock().written.clone();
    assert_eq!(1, written.len());
    assert_eq!(0x123, written[0].id);
    assert_eq!(4, written[0].dlc);
    assert_eq!([0xDE, 0xAD, 0xBE, 0xEF], written[0].data[..4]);
}

#[test]
fn filters() {
    let (mut session, api) = manual_session();
    session.connect(CH, Bitrate::BAUD_500K);
    assert_eq!((Status::OK, Some(FilterState::Closed)), session.query_filter());

    assert!(session.configure_filter(FilterConfig::Open).is_ok());
    assert_eq!((Status::OK, Some(FilterState::Open)), session.query_filter());

    let custom = FilterConfig::Custom {
        from_id: 0x100,
        to_id: 0x1FFFF,
        extended: true,
    };
    assert!(session.configure_filter(custom).is_ok());
    assert_eq!((Status::OK, Some(FilterState::Custom)), session.query_filter());
    assert_eq!(
        vec![(0x100u32, 0x1FFFFu32, ffi::PCAN_MODE_EXTENDED)],
        api.state.lock().filter_ranges
    );

    assert!(session.configure_filter(FilterConfig::Close).is_ok());
    assert_eq!((Status::OK, Some(FilterState::Closed)), session.query_filter());
}

#[test]
fn error_text_comes_from_the_driver() {
    let (session, _api) = manual_session();
    assert_eq!("fake error 10h", session.format_error(Status::BUSOFF));
}
