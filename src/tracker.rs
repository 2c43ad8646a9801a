// pcanbasic/src/tracker.rs
//
// Live per-message view of received CAN traffic.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Tracking of received messages.
//!
//! Received frames are coalesced into one [`MessageRecord`] per distinct
//! (ID, message type) pair. The record keeps the last frame, how often it
//! was seen, and when, so that a display can show one row per message
//! rather than a scrolling log.
//!
//! A reader thread feeds frames with [`MessageTracker::process`] while a
//! display tick collects the changed records with
//! [`MessageTracker::snapshot_dirty`]. Every operation holds one lock over
//! the whole store for its full duration, so a change made before a
//! snapshot is always seen by it, and seen exactly once.
//!
//! The type match is on the full `MSGTYPE` bitmask, so the echo of a
//! transmitted frame is tracked separately from the same frame received
//! from the bus.

use crate::{frame::CanFdFrame, CanFrame, Timestamp};
use embedded_can::Frame as EmbeddedFrame;
use log::trace;
use parking_lot::Mutex;

// ===== MessageRecord =====

/// The display state for one distinct (ID, type) message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    frame: CanFdFrame,
    timestamp: Timestamp,
    prev_timestamp: Timestamp,
    count: u32,
    dirty: bool,
    show_period: bool,
    index: usize,
}

impl MessageRecord {
    fn new(frame: CanFdFrame, timestamp: Timestamp, index: usize) -> Self {
        Self {
            frame,
            timestamp,
            prev_timestamp: timestamp,
            count: 1,
            dirty: false,
            show_period: true,
            index,
        }
    }

    fn matches(&self, frame: &CanFdFrame) -> bool {
        self.frame.raw_id() == frame.raw_id() && self.frame.msg_type() == frame.msg_type()
    }

    fn update(&mut self, frame: CanFdFrame, timestamp: Timestamp) {
        self.frame = frame;
        self.prev_timestamp = self.timestamp;
        self.timestamp = timestamp;
        self.dirty = true;
        self.count += 1;
    }

    /// Sets the time display mode, marking the record dirty if it changed.
    fn set_show_period(&mut self, on: bool) {
        if self.show_period != on {
            self.show_period = on;
            self.dirty = true;
        }
    }

    /// The last frame received
    pub fn frame(&self) -> &CanFdFrame {
        &self.frame
    }

    /// When the last frame was received
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// When the frame before the last one was received.
    ///
    /// This equals the timestamp until a second frame arrives.
    pub fn prev_timestamp(&self) -> Timestamp {
        self.prev_timestamp
    }

    /// The number of times the message was received
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Whether the record changed since the last display pass
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the time is shown as the period between the last two
    /// frames, rather than as the absolute receive time.
    pub fn show_period(&self) -> bool {
        self.show_period
    }

    /// The display position, assigned when the record was created
    pub fn index(&self) -> usize {
        self.index
    }

    /// The payload length of the last frame
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    /// Whether the last frame had no payload
    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// The time, in milliseconds, with one decimal place.
    pub fn time_string(&self) -> String {
        let mut ms = self.timestamp.as_millis_f64();
        if self.show_period {
            ms -= self.prev_timestamp.as_millis_f64();
        }
        format!("{:.1}", ms)
    }

    /// See [`CanFdFrame::type_string`]
    pub fn type_string(&self) -> String {
        self.frame.type_string()
    }

    /// See [`CanFdFrame::id_string`]
    pub fn id_string(&self) -> String {
        self.frame.id_string()
    }

    /// See [`CanFdFrame::data_string`]
    pub fn data_string(&self) -> String {
        self.frame.data_string()
    }
}

// ===== MessageTracker =====

/// What `process` did with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// A new record was created, so the display needs a new row.
    Inserted(MessageRecord),
    /// The existing record at this display index was updated.
    Updated(usize),
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<MessageRecord>,
    show_period: bool,
}

/// The shared store of message records.
///
/// New records take the store's current time display mode, which starts
/// out showing absolute timestamps.
#[derive(Debug, Default)]
pub struct MessageTracker {
    inner: Mutex<Inner>,
}

impl MessageTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received frame.
    ///
    /// If a record with the same ID and message type exists it's updated
    /// in place, otherwise a new one is appended at the next index.
    pub fn process(&self, frame: CanFdFrame, timestamp: Timestamp) -> Processed {
        let mut inner = self.inner.lock();

        if let Some(rec) = inner.records.iter_mut().find(|rec| rec.matches(&frame)) {
            rec.update(frame, timestamp);
            return Processed::Updated(rec.index);
        }

        let index = inner.records.len();
        let mut rec = MessageRecord::new(frame, timestamp, index);
        rec.set_show_period(inner.show_period);
        trace!("New message {} {} at {}", rec.id_string(), rec.type_string(), index);

        inner.records.push(rec.clone());
        Processed::Inserted(rec)
    }

    /// Records a frame received on a classic channel, normalizing it into
    /// the FD shape first.
    pub fn process_classic(&self, frame: CanFrame, timestamp: Timestamp) -> Processed {
        self.process(CanFdFrame::from(frame), timestamp)
    }

    /// Gets the records that changed since the last call, clearing their
    /// dirty flags.
    pub fn snapshot_dirty(&self) -> Vec<MessageRecord> {
        let mut inner = self.inner.lock();
        inner
            .records
            .iter_mut()
            .filter(|rec| rec.dirty)
            .map(|rec| {
                rec.dirty = false;
                rec.clone()
            })
            .collect()
    }

    /// Gets a copy of every record, in display order.
    pub fn records(&self) -> Vec<MessageRecord> {
        self.inner.lock().records.clone()
    }

    /// Removes all the records. Indexes start again from zero.
    pub fn clear(&self) {
        self.inner.lock().records.clear();
    }

    /// Switches every record, and any created later, between showing the
    /// period and the absolute time.
    ///
    /// Only records whose mode actually changes are marked dirty.
    pub fn set_global_period_mode(&self, show_period: bool) {
        let mut inner = self.inner.lock();
        inner.show_period = show_period;
        for rec in inner.records.iter_mut() {
            rec.set_show_period(show_period);
        }
    }

    /// The current time display mode for the store.
    pub fn global_period_mode(&self) -> bool {
        self.inner.lock().show_period
    }

    /// The number of distinct messages tracked
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    /// Whether no messages are tracked
    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }
}

/////////////////////////////////////////////////////////////////////////////
