// pcanbasic/src/reader.rs
//
// Reading received frames into the message tracker.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Receive paths.
//!
//! Frames can be pulled from the driver in one of three ways:
//!
//! - **Timer**: a background thread drains the receive queue at a fixed
//!   interval.
//! - **Event**: a background thread waits on the driver's receive event
//!   and drains the queue each time it's signalled. The wait is bounded so
//!   that the thread notices promptly when it's asked to stop.
//! - **Manual**: one frame is read each time the application asks.
//!
//! Only one of these is active at a time. The [`Reader`] always stops and
//! joins a running thread before starting another, so two readers never
//! drain the same queue. Threads are only ever stopped cooperatively.

use crate::{
    ffi::Handle, params::Parameter, tracker::MessageTracker, Error, PcanBasic, Result, Status,
};
use log::{debug, warn};
use std::{
    fmt, io,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

#[cfg(windows)]
use std::ptr;

// ===== ReaderConfig =====

/// Timing of the receive and display paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Interval between drains in timer mode
    pub read_interval: Duration,
    /// Interval between display refreshes
    pub display_interval: Duration,
    /// Longest single wait on the receive event
    pub event_timeout: Duration,
}

impl ReaderConfig {
    /// Sets the interval between drains in timer mode.
    pub fn read_interval(mut self, interval: Duration) -> Self {
        self.read_interval = interval;
        self
    }

    /// Sets the interval between display refreshes.
    pub fn display_interval(mut self, interval: Duration) -> Self {
        self.display_interval = interval;
        self
    }

    /// Sets the longest single wait on the receive event.
    pub fn event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_interval: Duration::from_millis(50),
            display_interval: Duration::from_millis(100),
            event_timeout: Duration::from_millis(1),
        }
    }
}

// ===== ReadMode =====

/// How received frames are pulled from the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Drain the queue periodically
    #[default]
    Timer,
    /// Drain the queue when the driver signals that frames arrived
    Event,
    /// Read one frame on request
    Manual,
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ReadMode::*;
        match *self {
            Timer => write!(f, "timer"),
            Event => write!(f, "event"),
            Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for ReadMode {
    type Err = io::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "timer" => Ok(Self::Timer),
            "event" => Ok(Self::Event),
            "manual" => Ok(Self::Manual),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown read mode '{}'", s),
            )),
        }
    }
}

// ===== ReadTarget =====

/// A connected channel, and the tracker that its frames go to.
#[derive(Debug, Clone)]
pub struct ReadTarget {
    pcan: Arc<PcanBasic>,
    tracker: Arc<MessageTracker>,
    channel: Handle,
    is_fd: bool,
}

impl ReadTarget {
    /// Creates a target for a channel.
    pub fn new(
        pcan: Arc<PcanBasic>,
        tracker: Arc<MessageTracker>,
        channel: Handle,
        is_fd: bool,
    ) -> Self {
        Self {
            pcan,
            tracker,
            channel,
            is_fd,
        }
    }

    /// The channel being read
    pub fn channel(&self) -> Handle {
        self.channel
    }

    /// Whether the channel was opened in FD mode
    pub fn is_fd(&self) -> bool {
        self.is_fd
    }

    /// The driver binding
    pub fn pcan(&self) -> &Arc<PcanBasic> {
        &self.pcan
    }

    // Reads one frame, returning the status and whether a frame was
    // handed to the tracker.
    fn read_frame(&self) -> (Status, bool) {
        if self.is_fd {
            match self.pcan.read_fd(self.channel) {
                (sts, Some(frame), Some(ts)) => {
                    self.tracker.process(frame, ts);
                    (sts, true)
                }
                (sts, ..) => (sts, false),
            }
        } else {
            match self.pcan.read(self.channel) {
                (sts, Some(frame), Some(ts)) => {
                    self.tracker.process_classic(frame, ts);
                    (sts, true)
                }
                (sts, ..) => (sts, false),
            }
        }
    }

    /// Reads a single frame from the receive queue, if there is one.
    pub fn read_once(&self) -> Status {
        self.read_frame().0
    }

    /// Reads frames until the receive queue is empty.
    ///
    /// Stops immediately on an illegal-operation status, and on any
    /// status that doesn't deliver a frame.
    pub fn drain(&self) -> Status {
        loop {
            let (sts, got_frame) = self.read_frame();
            if sts.is_illegal_operation() || sts.is_queue_empty() || !got_frame {
                return sts;
            }
        }
    }
}

// ===== ReceiveEvent =====

/// A driver-supplied signal that frames have arrived.
pub trait ReceiveEvent: Send {
    /// Blocks until the event is signalled or the timeout expires.
    ///
    /// Returns `true` if the event was signalled.
    fn wait(&mut self, timeout: Duration) -> bool;

    /// Called once when the reader thread exits.
    fn detach(&mut self) {}
}

// Whole milliseconds for a bounded wait, rounded up so that a short
// timeout never turns into a busy loop.
fn wait_millis(timeout: Duration) -> u128 {
    ((timeout.as_micros() + 999) / 1000).max(1)
}

/// The receive event of a channel, as a pollable file descriptor.
#[cfg(unix)]
#[derive(Debug)]
pub struct PollEvent {
    fd: std::os::unix::io::RawFd,
}

#[cfg(unix)]
impl PollEvent {
    /// Gets the receive event descriptor of an initialized channel.
    pub fn attach(pcan: &PcanBasic, channel: Handle) -> std::result::Result<Self, Status> {
        let (sts, fd) = pcan.get_u32(channel, Parameter::RECEIVE_EVENT);
        if !sts.is_ok() {
            return Err(sts);
        }
        Ok(Self { fd: fd as _ })
    }
}

#[cfg(unix)]
impl ReceiveEvent for PollEvent {
    fn wait(&mut self, timeout: Duration) -> bool {
        use nix::{
            errno::Errno,
            poll::{poll, PollFd, PollFlags, PollTimeout},
        };
        use std::os::fd::BorrowedFd;

        // The driver owns the descriptor and keeps it open while the
        // channel is initialized.
        let fd = unsafe { BorrowedFd::borrow_raw(self.fd) };
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        let ms = u16::try_from(wait_millis(timeout)).unwrap_or(u16::MAX);

        match poll(&mut fds, PollTimeout::from(ms)) {
            Ok(n) => n > 0,
            Err(Errno::EINTR) => false,
            Err(err) => {
                warn!("Polling the receive event failed: {}", err);
                thread::sleep(timeout);
                false
            }
        }
    }
}

/// The receive event of a channel, as a Win32 event object handed to
/// the driver.
///
/// The event is auto-reset, so a successful wait clears it. Detaching
/// takes the event back from the driver and closes it.
#[cfg(windows)]
#[derive(Debug)]
pub struct HandleEvent {
    pcan: Arc<PcanBasic>,
    channel: Handle,
    event: winapi::shared::ntdef::HANDLE,
}

// The handle is only a kernel object reference, usable from any thread.
#[cfg(windows)]
unsafe impl Send for HandleEvent {}

#[cfg(windows)]
impl HandleEvent {
    /// Creates an event and registers it as the receive event of an
    /// initialized channel.
    pub fn attach(pcan: Arc<PcanBasic>, channel: Handle) -> std::result::Result<Self, Status> {
        use winapi::um::{handleapi::CloseHandle, synchapi::CreateEventW};

        let event = unsafe { CreateEventW(ptr::null_mut(), 0, 0, ptr::null()) };
        if event.is_null() {
            warn!("Unable to create the receive event: {}", io::Error::last_os_error());
            return Err(Status::RESOURCE);
        }

        let sts = pcan.set_value(channel, Parameter::RECEIVE_EVENT, &(event as usize).to_ne_bytes());
        if !sts.is_ok() {
            unsafe { CloseHandle(event) };
            return Err(sts);
        }
        Ok(Self {
            pcan,
            channel,
            event,
        })
    }
}

#[cfg(windows)]
impl ReceiveEvent for HandleEvent {
    fn wait(&mut self, timeout: Duration) -> bool {
        use winapi::um::{synchapi::WaitForSingleObject, winbase::WAIT_OBJECT_0};

        if self.event.is_null() {
            return false;
        }
        let ms = u32::try_from(wait_millis(timeout)).unwrap_or(u32::MAX);
        unsafe { WaitForSingleObject(self.event, ms) == WAIT_OBJECT_0 }
    }

    fn detach(&mut self) {
        use winapi::um::handleapi::CloseHandle;

        if self.event.is_null() {
            return;
        }
        let sts = self.pcan.set_u32(self.channel, Parameter::RECEIVE_EVENT, 0);
        if !sts.is_ok() {
            debug!("Resetting the receive event gave {:X}h", sts);
        }
        unsafe { CloseHandle(self.event) };
        self.event = ptr::null_mut();
    }
}

#[cfg(windows)]
impl Drop for HandleEvent {
    fn drop(&mut self) {
        self.detach();
    }
}

/// A stand-in receive event that sleeps for the timeout and always
/// reports a signal, so the queue is drained at that rate.
///
/// It's never chosen automatically. Pass it to
/// [`Reader::set_event_mode_with`] where the driver offers no event.
#[derive(Debug, Default)]
pub struct SleepEvent;

impl ReceiveEvent for SleepEvent {
    fn wait(&mut self, timeout: Duration) -> bool {
        thread::sleep(timeout);
        true
    }
}

/// Gets the receive event of a channel from the driver.
///
/// Fails with the driver's status if the channel has no event to give,
/// and with `NODRIVER` on platforms the driver doesn't support.
pub fn attach_receive_event(
    pcan: &Arc<PcanBasic>,
    channel: Handle,
) -> std::result::Result<Box<dyn ReceiveEvent>, Status> {
    #[cfg(unix)]
    {
        Ok(Box::new(PollEvent::attach(pcan, channel)?))
    }
    #[cfg(windows)]
    {
        Ok(Box::new(HandleEvent::attach(pcan.clone(), channel)?))
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (pcan, channel);
        Err(Status::NODRIVER)
    }
}

// ===== Worker =====

/// A background thread that runs until asked to stop.
#[derive(Debug)]
struct Worker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    fn spawn<F>(name: &str, f: F) -> io::Result<Self>
    where
        F: FnOnce(Arc<AtomicBool>) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || f(thread_stop))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Asks the thread to stop and waits for it.
    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Reader thread panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn timer_loop(target: ReadTarget, interval: Duration, stop: Arc<AtomicBool>) {
    debug!("Timer reader started on {:X}h", target.channel);
    while !stop.load(Ordering::Relaxed) {
        target.drain();
        thread::sleep(interval);
    }
    debug!("Timer reader stopped");
}

fn event_loop(
    target: ReadTarget,
    mut event: Box<dyn ReceiveEvent>,
    timeout: Duration,
    stop: Arc<AtomicBool>,
) {
    debug!("Event reader started on {:X}h", target.channel);
    while !stop.load(Ordering::Relaxed) {
        if event.wait(timeout) {
            target.drain();
        }
    }
    event.detach();
    debug!("Event reader stopped");
}

// ===== Reader =====

/// Runs the selected receive path for a channel.
#[derive(Debug)]
pub struct Reader {
    target: ReadTarget,
    config: ReaderConfig,
    mode: ReadMode,
    worker: Option<Worker>,
}

impl Reader {
    /// Creates a reader in manual mode. Nothing runs until a mode is set.
    pub fn new(target: ReadTarget, config: ReaderConfig) -> Self {
        Self {
            target,
            config,
            mode: ReadMode::Manual,
            worker: None,
        }
    }

    /// The active read mode
    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// The channel being read
    pub fn target(&self) -> &ReadTarget {
        &self.target
    }

    /// Whether a background reader thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Switches the read mode, stopping any running thread first.
    ///
    /// Event mode gets the receive event from the driver. If that fails
    /// the reader is left in manual mode and the status is returned.
    pub fn set_mode(&mut self, mode: ReadMode) -> Result<()> {
        match mode {
            ReadMode::Event => {
                self.stop();
                let event = attach_receive_event(&self.target.pcan, self.target.channel)?;
                self.start_event(event)
            }
            ReadMode::Timer => {
                self.stop();
                let target = self.target.clone();
                let interval = self.config.read_interval;
                self.worker = Some(Worker::spawn("pcan-timer-reader", move |stop| {
                    timer_loop(target, interval, stop)
                })?);
                self.mode = ReadMode::Timer;
                Ok(())
            }
            ReadMode::Manual => {
                self.stop();
                Ok(())
            }
        }
    }

    /// Switches to event mode, waiting on the given event.
    pub fn set_event_mode_with(&mut self, event: Box<dyn ReceiveEvent>) -> Result<()> {
        self.stop();
        self.start_event(event)
    }

    fn start_event(&mut self, event: Box<dyn ReceiveEvent>) -> Result<()> {
        let target = self.target.clone();
        let timeout = self.config.event_timeout;
        self.worker = Some(
            Worker::spawn("pcan-event-reader", move |stop| {
                event_loop(target, event, timeout, stop)
            })
            .map_err(Error::from)?,
        );
        self.mode = ReadMode::Event;
        Ok(())
    }

    /// Reads a single frame. This works in any mode, but is meant for
    /// manual mode.
    pub fn read_manual(&self) -> Status {
        self.target.read_once()
    }

    /// Stops any running reader thread, and waits for it to exit.
    ///
    /// The reader is left in manual mode.
    pub fn stop(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            debug!("Stopped {} reader", self.mode);
        }
        self.mode = ReadMode::Manual;
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.stop();
    }
}

/////////////////////////////////////////////////////////////////////////////
