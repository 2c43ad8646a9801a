// pcanbasic/tests/tracker.rs
//
// Integration tests for the message tracker under concurrent use.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

use pcanbasic::{
    id::id_from_raw, CanFrame, EmbeddedFrame, MessageTracker, Processed, Timestamp,
};
use std::{collections::HashSet, sync::Arc, thread};

fn frame(id: u32) -> CanFrame {
    CanFrame::new(id_from_raw(id).unwrap(), &[id as u8]).unwrap()
}

#[test]
fn concurrent_writers_get_unique_indexes() {
    let tracker = Arc::new(MessageTracker::new());

    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let tracker = tracker.clone();
            thread::spawn(move || {
                for i in 0..50u32 {
                    tracker.process_classic(frame(t * 0x100 + i), Timestamp(i as u64));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let recs = tracker.records();
    assert_eq!(200, recs.len());
    let idx: HashSet<_> = recs.iter().map(|r| r.index()).collect();
    assert_eq!((0..200).collect::<HashSet<_>>(), idx);
}

#[test]
fn every_change_is_seen_by_exactly_one_snapshot() {
    let tracker = Arc::new(MessageTracker::new());
    const N: u32 = 500;

    let writer = {
        let tracker = tracker.clone();
        thread::spawn(move || {
            for i in 0..N {
                tracker.process_classic(frame(0x100), Timestamp(i as u64));
            }
        })
    };

    // Each snapshot sees the record at most once, with a count at least
    // as large as the last one seen.
    let mut last = 0;
    while !writer.is_finished() {
        for rec in tracker.snapshot_dirty() {
            assert!(rec.count() > last);
            last = rec.count();
        }
    }
    writer.join().unwrap();

    for rec in tracker.snapshot_dirty() {
        last = rec.count();
    }
    assert_eq!(N, last);
    assert!(tracker.snapshot_dirty().is_empty());
}

#[test]
fn echo_frames_are_tracked_apart() {
    use pcanbasic::{CanFdFrame, MessageType};

    let tracker = MessageTracker::new();
    let id = id_from_raw(0x7FF).unwrap();
    let rx = CanFdFrame::from(CanFrame::new(id, &[1]).unwrap());
    let echo = CanFdFrame::from(CanFrame::with_type(id, &[1], MessageType::ECHO).unwrap());

    tracker.process(rx, Timestamp(0));
    match tracker.process(echo, Timestamp(0)) {
        Processed::Inserted(rec) => assert_eq!(1, rec.index()),
        other => panic!("unexpected {:?}", other),
    }
}
