// pcanbasic/tests/reader.rs
//
// Integration tests for the receive paths.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

mod common;

use common::fake_pcan;
use pcanbasic::{
    ffi, EmbeddedFrame, MessageTracker, ReadMode, ReadTarget, Reader, ReaderConfig, ReceiveEvent,
    Status,
};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

const CH: u16 = ffi::PCAN_USBBUS1;

fn target(is_fd: bool) -> (ReadTarget, Arc<MessageTracker>, common::FakeApi) {
    let (pcan, api) = fake_pcan();
    let tracker = Arc::new(MessageTracker::new());
    let target = ReadTarget::new(pcan, tracker.clone(), CH, is_fd);
    (target, tracker, api)
}

// Polls until the condition holds, or gives up after a second.
fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(1) {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn drain_empties_the_queue() {
    let (target, tracker, api) = target(false);
    api.push_rx(0x100, 0, &[1], 1000);
    api.push_rx(0x200, 0, &[2], 2000);
    api.push_rx(0x100, 0, &[3], 3000);

    assert!(target.drain().is_queue_empty());
    assert_eq!(0, api.rx_len());
    assert_eq!(4, api.count("read"));

    let recs = tracker.records();
    assert_eq!(2, recs.len());
    assert_eq!(2, recs[0].count());
    assert_eq!(&[3], recs[0].frame().data());
}

#[test]
fn drain_stops_on_illegal_operation() {
    let (target, tracker, api) = target(true);
    api.state.lock().empty_status = Some(Status::ILLOPERATION);

    assert_eq!(Status::ILLOPERATION, target.drain());
    assert_eq!(1, api.count("read_fd"));
    assert!(tracker.is_empty());
}

#[test]
fn drain_stops_on_a_status_without_a_frame() {
    let (target, _tracker, api) = target(true);
    let sts = Status(ffi::PCAN_ERROR_BUSOFF | ffi::PCAN_ERROR_ILLHANDLE);
    api.state.lock().empty_status = Some(sts);

    target.drain();
    assert_eq!(1, api.count("read_fd"));
}

#[test]
fn fd_frames_are_tracked_by_type() {
    let (target, tracker, api) = target(true);
    api.push_rx(0x100, ffi::PCAN_MESSAGE_FD, &[0; 12], 10);
    api.push_rx(0x100, ffi::PCAN_MESSAGE_FD | ffi::PCAN_MESSAGE_BRS, &[0; 12], 20);
    api.push_rx(0x100, 0, &[0; 2], 30);
    target.drain();

    let recs = tracker.records();
    assert_eq!(3, recs.len());
    assert!(recs[1].frame().is_brs());
    assert!(!recs[2].frame().is_fd());
}

#[test]
fn manual_read_takes_one_frame() {
    let (target, tracker, api) = target(false);
    api.push_rx(0x100, 0, &[1], 0);
    api.push_rx(0x101, 0, &[1], 0);

    let reader = Reader::new(target, ReaderConfig::default());
    assert_eq!(ReadMode::Manual, reader.mode());
    assert!(reader.read_manual().is_ok());
    assert_eq!(1, tracker.len());
    assert_eq!(1, api.rx_len());
}

#[test]
fn timer_reader_feeds_the_tracker() {
    let (target, tracker, api) = target(false);
    let config = ReaderConfig::default().read_interval(Duration::from_millis(5));
    let mut reader = Reader::new(target, config);

    reader.set_mode(ReadMode::Timer).unwrap();
    assert!(reader.is_running());

    api.push_rx(0x321, 0, &[1, 2], 0);
    assert!(wait_for(|| tracker.len() == 1));

    reader.stop();
    assert!(!reader.is_running());
    assert_eq!(ReadMode::Manual, reader.mode());

    // Nothing reads after the thread is joined
    let reads = api.count("read");
    thread::sleep(Duration::from_millis(20));
    assert_eq!(reads, api.count("read"));
}

// An event that fires on demand, counting waits and detaches.
#[derive(Clone, Default)]
struct TestEvent {
    fire: Arc<AtomicBool>,
    waits: Arc<AtomicUsize>,
    detached: Arc<AtomicBool>,
}

impl ReceiveEvent for TestEvent {
    fn wait(&mut self, timeout: Duration) -> bool {
        self.waits.fetch_add(1, Ordering::SeqCst);
        if self.fire.swap(false, Ordering::SeqCst) {
            true
        } else {
            thread::sleep(timeout);
            false
        }
    }

    fn detach(&mut self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

#[test]
fn event_reader_drains_when_signalled() {
    let (target, tracker, api) = target(true);
    let mut reader = Reader::new(target, ReaderConfig::default());
    let event = TestEvent::default();

    reader.set_event_mode_with(Box::new(event.clone())).unwrap();
    assert_eq!(ReadMode::Event, reader.mode());
    assert!(wait_for(|| event.waits.load(Ordering::SeqCst) > 2));

    // Waits without a signal don't read
    assert_eq!(0, api.count("read_fd"));

    api.push_rx(0x100, 0, &[1], 0);
    event.fire.store(true, Ordering::SeqCst);
    assert!(wait_for(|| tracker.len() == 1));

    reader.stop();
    assert!(event.detached.load(Ordering::SeqCst));
}

#[test]
fn event_mode_needs_the_driver_event() {
    let (target, _tracker, api) = target(false);
    let config = ReaderConfig::default().read_interval(Duration::from_millis(5));
    let mut reader = Reader::new(target, config);
    reader.set_mode(ReadMode::Timer).unwrap();

    // The fake driver has no receive event to give
    assert!(reader.set_mode(ReadMode::Event).is_err());
    assert_eq!(ReadMode::Manual, reader.mode());
    assert!(!reader.is_running());

    let reads = api.count("read");
    thread::sleep(Duration::from_millis(20));
    assert_eq!(reads, api.count("read"));
}

#[test]
fn switching_modes_replaces_the_thread() {
    let (target, tracker, api) = target(false);
    let config = ReaderConfig::default().read_interval(Duration::from_millis(5));
    let mut reader = Reader::new(target, config);
    let event = TestEvent::default();

    reader.set_event_mode_with(Box::new(event.clone())).unwrap();
    reader.set_mode(ReadMode::Timer).unwrap();

    // The event thread was joined before the timer started
    assert!(event.detached.load(Ordering::SeqCst));
    assert_eq!(ReadMode::Timer, reader.mode());

    api.push_rx(0x100, 0, &[], 0);
    assert!(wait_for(|| tracker.len() == 1));

    reader.set_mode(ReadMode::Manual).unwrap();
    assert!(!reader.is_running());
}

#[test]
fn dropping_the_reader_stops_it() {
    let (target, _tracker, api) = target(false);
    let config = ReaderConfig::default().read_interval(Duration::from_millis(2));
    let mut reader = Reader::new(target, config);
    reader.set_mode(ReadMode::Timer).unwrap();
    assert!(wait_for(|| api.count("read") > 0));
    drop(reader);

    let reads = api.count("read");
    thread::sleep(Duration::from_millis(20));
    assert_eq!(reads, api.count("read"));
}
