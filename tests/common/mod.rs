// pcanbasic/tests/common/mod.rs
//
// A scripted stand-in for the PCAN-Basic driver.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

#![allow(dead_code)]

use parking_lot::Mutex;
use pcanbasic::{
    ffi::{self, Handle, TPCANChannelInformation, TPCANMsg, TPCANMsgFD, TPCANTimestamp},
    Api, BindError, Loader, PcanBasic, Status,
};
use std::{
    collections::VecDeque,
    ffi::CStr,
    mem::size_of,
    ptr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// What the fake driver returns, and what it was asked to do.
#[derive(Debug, Default)]
pub struct FakeState {
    /// Frames waiting in the receive queue, with their time in microseconds
    pub rx: VecDeque<(TPCANMsgFD, u64)>,
    /// Returned by a read once the queue is empty
    pub empty_status: Option<Status>,
    /// Returned by the initialize calls
    pub init_status: Status,
    /// Returned when getting the attached channel count
    pub attached_status: Status,
    /// Channels reported as attached
    pub attached: Vec<TPCANChannelInformation>,
    /// Value of the message filter parameter
    pub filter: u32,
    /// Ranges passed to `CAN_FilterMessages`
    pub filter_ranges: Vec<(u32, u32, u8)>,
    /// Frames passed to the write calls
    pub written: Vec<TPCANMsgFD>,
    /// The names of the calls, in order
    pub log: Vec<&'static str>,
}

/// A driver that plays back the shared state.
#[derive(Clone, Default)]
pub struct FakeApi {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, name: &'static str) {
        self.state.lock().log.push(name);
    }

    /// Queues a received frame.
    pub fn push_rx(&self, id: u32, msgtype: u8, data: &[u8], micros: u64) {
        let mut msg = TPCANMsgFD {
            id,
            msgtype,
            dlc: data.len() as u8,
            ..TPCANMsgFD::default()
        };
        msg.data[..data.len()].copy_from_slice(data);
        self.state.lock().rx.push_back((msg, micros));
    }

    /// Adds an attached channel.
    pub fn attach(&self, handle: Handle, fd: bool, available: bool) {
        let info = TPCANChannelInformation {
            channel_handle: handle,
            device_features: if fd { ffi::FEATURE_FD_CAPABLE } else { 0 },
            channel_condition: if available {
                ffi::PCAN_CHANNEL_AVAILABLE
            } else {
                ffi::PCAN_CHANNEL_OCCUPIED
            },
            ..TPCANChannelInformation::default()
        };
        self.state.lock().attached.push(info);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().log.clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.state.lock().log.iter().filter(|n| **n == name).count()
    }

    pub fn rx_len(&self) -> usize {
        self.state.lock().rx.len()
    }

    fn next_rx(&self) -> Result<(TPCANMsgFD, u64), Status> {
        let mut st = self.state.lock();
        st.rx
            .pop_front()
            .ok_or(st.empty_status.unwrap_or(Status::QRCVEMPTY))
    }
}

impl Api for FakeApi {
    fn initialize(&self, _: Handle, _: u16, _: u8, _: u32, _: u16) -> Status {
        self.log("initialize");
        self.state.lock().init_status
    }

    fn initialize_fd(&self, _: Handle, _: &CStr) -> Status {
        self.log("initialize_fd");
        self.state.lock().init_status
    }

    fn uninitialize(&self, _: Handle) -> Status {
        self.log("uninitialize");
        Status::OK
    }

    fn reset(&self, _: Handle) -> Status {
        self.log("reset");
        Status::OK
    }

    fn get_status(&self, _: Handle) -> Status {
        self.log("get_status");
        Status::BUSLIGHT
    }

    fn read(&self, _: Handle, msg: &mut TPCANMsg, ts: &mut TPCANTimestamp) -> Status {
        self.log("read");
        match self.next_rx() {
            Ok((fd, micros)) => {
                msg.id = fd.id;
                msg.msgtype = fd.msgtype;
                msg.len = fd.dlc;
                msg.data.copy_from_slice(&fd.data[..8]);
                ts.millis = (micros / 1000) as u32;
                ts.micros = (micros % 1000) as u16;
                Status::OK
            }
            Err(sts) => sts,
        }
    }

    fn read_fd(&self, _: Handle, msg: &mut TPCANMsgFD, ts: &mut u64) -> Status {
        self.log("read_fd");
        match self.next_rx() {
            Ok((fd, micros)) => {
                *msg = fd;
                *ts = micros;
                Status::OK
            }
            Err(sts) => sts,
        }
    }

    fn write(&self, _: Handle, msg: &TPCANMsg) -> Status {
        self.log("write");
        let mut fd = TPCANMsgFD {
            id: msg.id,
            msgtype: msg.msgtype,
            dlc: msg.len,
            ..TPCANMsgFD::default()
        };
        fd.data[..8].copy_from_slice(&msg.data);
        self.state.lock().written.push(fd);
        Status::OK
    }

    fn write_fd(&self, _: Handle, msg: &TPCANMsgFD) -> Status {
        self.log("write_fd");
        self.state.lock().written.push(*msg);
        Status::OK
    }

    fn filter_messages(&self, _: Handle, from_id: u32, to_id: u32, mode: u8) -> Status {
        self.log("filter_messages");
        let mut st = self.state.lock();
        st.filter_ranges.push((from_id, to_id, mode));
        st.filter = ffi::PCAN_FILTER_CUSTOM;
        Status::OK
    }

    fn get_value(&self, _: Handle, parameter: u8, buf: &mut [u8]) -> Status {
        self.log("get_value");
        let st = self.state.lock();
        match parameter {
            0x04 => {
                buf[..4].copy_from_slice(&st.filter.to_ne_bytes());
                Status::OK
            }
            0x2A => {
                buf[..4].copy_from_slice(&(st.attached.len() as u32).to_ne_bytes());
                st.attached_status
            }
            0x2B => {
                let n = size_of::<TPCANChannelInformation>();
                for (info, chunk) in st.attached.iter().zip(buf.chunks_exact_mut(n)) {
                    unsafe {
                        ptr::write_unaligned(chunk.as_mut_ptr() as *mut TPCANChannelInformation, *info)
                    };
                }
                Status::OK
            }
            _ => Status::ILLPARAMTYPE,
        }
    }

    fn set_value(&self, _: Handle, parameter: u8, buf: &[u8]) -> Status {
        self.log("set_value");
        if parameter == 0x04 {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&buf[..4]);
            self.state.lock().filter = u32::from_ne_bytes(bytes);
            Status::OK
        } else {
            Status::ILLPARAMTYPE
        }
    }

    fn get_error_text(&self, error: Status, _: u16, buf: &mut [u8]) -> Status {
        self.log("get_error_text");
        let text = format!("fake error {:X}h\0", error);
        buf[..text.len()].copy_from_slice(text.as_bytes());
        Status::OK
    }

    fn lookup_channel(&self, _: &CStr, handle: &mut Handle) -> Status {
        self.log("lookup_channel");
        *handle = ffi::PCAN_USBBUS1;
        Status::OK
    }
}

/// A loader that hands out a fake driver, or fails, and counts attempts.
#[derive(Default)]
pub struct FakeLoader {
    pub api: FakeApi,
    pub fail: bool,
    pub loads: AtomicUsize,
}

impl FakeLoader {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl Loader for FakeLoader {
    fn load(&self) -> Result<Box<dyn Api>, BindError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(BindError::MissingExport("CAN_ReadFD"))
        } else {
            Ok(Box::new(self.api.clone()))
        }
    }
}

/// Creates a binding to a fresh fake driver.
pub fn fake_pcan() -> (Arc<PcanBasic>, FakeApi) {
    let loader = FakeLoader::default();
    let pcan = Arc::new(PcanBasic::with_loader(&loader));
    (pcan, loader.api)
}
