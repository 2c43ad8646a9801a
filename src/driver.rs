// pcanbasic/src/driver.rs
//
// Runtime binding to the PCAN-Basic shared library.
//
// This file is part of the Rust 'pcanbasic' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! The driver binding.
//!
//! The vendor library is loaded when a [`PcanBasic`] is created, rather
//! than linked at build time, so that an application can start and report
//! the problem when the driver is not installed.
//!
//! If the library can't be found, or it is missing any one of the
//! functions used here, the binding is left invalid. Every call on an
//! invalid binding returns [`Status::UNKNOWN`] without touching the
//! driver. There's no retry; create a new binding to try again.
//!
//! The native calls are reached through the [`Api`] trait. The default
//! [`LibraryLoader`] resolves it from the shared library, but any other
//! [`Loader`] can be supplied, which is how the binding is tested without
//! hardware.

use crate::{
    ffi::{self, Handle, TPCANMsg, TPCANMsgFD, TPCANTimestamp, TPCANTimestampFD},
    params::{Bitrate, HardwareType, Language, Parameter},
    BindError, CanFdFrame, CanFrame, MessageType, Status, Timestamp,
};
use libc::{c_char, c_void};
use libloading::Library;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::{
    env,
    ffi::{CStr, CString},
    fmt,
    mem::size_of,
    path::PathBuf,
};

/// Environment variable that overrides the name of the library to load
pub const LIBRARY_ENV_VAR: &str = "PCANBASIC_LIB";

/// The name of the driver library on this platform
#[cfg(windows)]
pub const LIBRARY_NAME: &str = "PCANBasic.dll";

/// The name of the driver library on this platform
#[cfg(target_os = "macos")]
pub const LIBRARY_NAME: &str = "libPCBUSB.dylib";

/// The name of the driver library on this platform
#[cfg(all(unix, not(target_os = "macos")))]
pub const LIBRARY_NAME: &str = "libpcanbasic.so";

// ===== Api trait =====

/// The native entry points of the driver.
///
/// Each method maps 1:1 onto an exported `CAN_*` function.
pub trait Api: Send + Sync {
    /// `CAN_Initialize`
    fn initialize(
        &self,
        channel: Handle,
        btr0btr1: u16,
        hw_type: u8,
        io_port: u32,
        interrupt: u16,
    ) -> Status;

    /// `CAN_InitializeFD`
    fn initialize_fd(&self, channel: Handle, bitrate_fd: &CStr) -> Status;

    /// `CAN_Uninitialize`
    fn uninitialize(&self, channel: Handle) -> Status;

    /// `CAN_Reset`
    fn reset(&self, channel: Handle) -> Status;

    /// `CAN_GetStatus`
    fn get_status(&self, channel: Handle) -> Status;

    /// `CAN_Read`
    fn read(&self, channel: Handle, msg: &mut TPCANMsg, ts: &mut TPCANTimestamp) -> Status;

    /// `CAN_ReadFD`
    fn read_fd(&self, channel: Handle, msg: &mut TPCANMsgFD, ts: &mut TPCANTimestampFD)
        -> Status;

    /// `CAN_Write`
    fn write(&self, channel: Handle, msg: &TPCANMsg) -> Status;

    /// `CAN_WriteFD`
    fn write_fd(&self, channel: Handle, msg: &TPCANMsgFD) -> Status;

    /// `CAN_FilterMessages`
    fn filter_messages(&self, channel: Handle, from_id: u32, to_id: u32, mode: u8) -> Status;

    /// `CAN_GetValue`
    fn get_value(&self, channel: Handle, parameter: u8, buf: &mut [u8]) -> Status;

    /// `CAN_SetValue`
    fn set_value(&self, channel: Handle, parameter: u8, buf: &[u8]) -> Status;

    /// `CAN_GetErrorText`
    ///
    /// The buffer must hold at least 256 bytes.
    fn get_error_text(&self, error: Status, language: u16, buf: &mut [u8]) -> Status;

    /// `CAN_LookUpChannel`
    fn lookup_channel(&self, parameters: &CStr, handle: &mut Handle) -> Status;
}

// ===== Loader =====

/// Something that can produce the native entry points.
pub trait Loader {
    /// Attempts to bind to the driver.
    fn load(&self) -> Result<Box<dyn Api>, BindError>;
}

/// Loads the driver from the vendor shared library.
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    path: PathBuf,
}

impl LibraryLoader {
    /// Creates a loader for the platform's default library.
    ///
    /// The name can be overridden with the `PCANBASIC_LIB` environment
    /// variable.
    pub fn new() -> Self {
        let path = env::var_os(LIBRARY_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(LIBRARY_NAME));
        Self { path }
    }

    /// Creates a loader for a library at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The name or path of the library that will be loaded
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader for LibraryLoader {
    fn load(&self) -> Result<Box<dyn Api>, BindError> {
        Ok(Box::new(LibraryApi::open(&self.path)?))
    }
}

// ===== LibraryApi =====

/// Resolves an export, copying out the function pointer.
///
/// # Safety
/// `T` must be the function pointer type matching the export. The pointer
/// is only valid while `lib` stays loaded.
unsafe fn export<T: Copy>(lib: &Library, name: &'static str) -> Result<T, BindError> {
    lib.get::<T>(name.as_bytes())
        .map(|sym| *sym)
        .map_err(|_| BindError::MissingExport(name))
}

/// The entry points resolved from the vendor library.
struct LibraryApi {
    initialize: ffi::CAN_Initialize,
    initialize_fd: ffi::CAN_InitializeFD,
    uninitialize: ffi::CAN_Uninitialize,
    reset: ffi::CAN_Reset,
    get_status: ffi::CAN_GetStatus,
    read: ffi::CAN_Read,
    read_fd: ffi::CAN_ReadFD,
    write: ffi::CAN_Write,
    write_fd: ffi::CAN_WriteFD,
    filter_messages: ffi::CAN_FilterMessages,
    get_value: ffi::CAN_GetValue,
    set_value: ffi::CAN_SetValue,
    get_error_text: ffi::CAN_GetErrorText,
    lookup_channel: ffi::CAN_LookUpChannel,
    // Declared last, so it's dropped after the pointers into it.
    _lib: Library,
}

impl LibraryApi {
    fn open(path: &PathBuf) -> Result<Self, BindError> {
        let lib = unsafe { Library::new(path) }.map_err(|source| BindError::Library {
            name: path.display().to_string(),
            source,
        })?;

        unsafe {
            Ok(Self {
                initialize: export(&lib, "CAN_Initialize")?,
                initialize_fd: export(&lib, "CAN_InitializeFD")?,
                uninitialize: export(&lib, "CAN_Uninitialize")?,
                reset: export(&lib, "CAN_Reset")?,
                get_status: export(&lib, "CAN_GetStatus")?,
                read: export(&lib, "CAN_Read")?,
                read_fd: export(&lib, "CAN_ReadFD")?,
                write: export(&lib, "CAN_Write")?,
                write_fd: export(&lib, "CAN_WriteFD")?,
                filter_messages: export(&lib, "CAN_FilterMessages")?,
                get_value: export(&lib, "CAN_GetValue")?,
                set_value: export(&lib, "CAN_SetValue")?,
                get_error_text: export(&lib, "CAN_GetErrorText")?,
                lookup_channel: export(&lib, "CAN_LookUpChannel")?,
                _lib: lib,
            })
        }
    }
}

impl Api for LibraryApi {
    fn initialize(
        &self,
        channel: Handle,
        btr0btr1: u16,
        hw_type: u8,
        io_port: u32,
        interrupt: u16,
    ) -> Status {
        Status(unsafe { (self.initialize)(channel, btr0btr1, hw_type, io_port, interrupt) })
    }

    fn initialize_fd(&self, channel: Handle, bitrate_fd: &CStr) -> Status {
        // The driver takes a non-const pointer but never writes through it
        Status(unsafe { (self.initialize_fd)(channel, bitrate_fd.as_ptr() as *mut c_char) })
    }

    fn uninitialize(&self, channel: Handle) -> Status {
        Status(unsafe { (self.uninitialize)(channel) })
    }

    fn reset(&self, channel: Handle) -> Status {
        Status(unsafe { (self.reset)(channel) })
    }

    fn get_status(&self, channel: Handle) -> Status {
        Status(unsafe { (self.get_status)(channel) })
    }

    fn read(&self, channel: Handle, msg: &mut TPCANMsg, ts: &mut TPCANTimestamp) -> Status {
        Status(unsafe { (self.read)(channel, msg, ts) })
    }

    fn read_fd(
        &self,
        channel: Handle,
        msg: &mut TPCANMsgFD,
        ts: &mut TPCANTimestampFD,
    ) -> Status {
        Status(unsafe { (self.read_fd)(channel, msg, ts) })
    }

    fn write(&self, channel: Handle, msg: &TPCANMsg) -> Status {
        let mut msg = *msg;
        Status(unsafe { (self.write)(channel, &mut msg) })
    }

    fn write_fd(&self, channel: Handle, msg: &TPCANMsgFD) -> Status {
        let mut msg = *msg;
        Status(unsafe { (self.write_fd)(channel, &mut msg) })
    }

    fn filter_messages(&self, channel: Handle, from_id: u32, to_id: u32, mode: u8) -> Status {
        Status(unsafe { (self.filter_messages)(channel, from_id, to_id, mode) })
    }

    fn get_value(&self, channel: Handle, parameter: u8, buf: &mut [u8]) -> Status {
        Status(unsafe {
            (self.get_value)(
                channel,
                parameter,
                buf.as_mut_ptr() as *mut c_void,
                buf.len() as u32,
            )
        })
    }

    fn set_value(&self, channel: Handle, parameter: u8, buf: &[u8]) -> Status {
        let mut buf = buf.to_vec();
        Status(unsafe {
            (self.set_value)(
                channel,
                parameter,
                buf.as_mut_ptr() as *mut c_void,
                buf.len() as u32,
            )
        })
    }

    fn get_error_text(&self, error: Status, language: u16, buf: &mut [u8]) -> Status {
        if buf.len() < ffi::MAX_LENGTH_ERROR_TEXT {
            return Status::ILLPARAMVAL;
        }
        Status(unsafe {
            (self.get_error_text)(error.bits(), language, buf.as_mut_ptr() as *mut c_char)
        })
    }

    fn lookup_channel(&self, parameters: &CStr, handle: &mut Handle) -> Status {
        Status(unsafe { (self.lookup_channel)(parameters.as_ptr() as *mut c_char, handle) })
    }
}

// ===== PcanBasic =====

/// Gets the text from a nul-terminated byte buffer filled by the driver.
fn buf_to_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// A binding to the PCAN-Basic driver.
///
/// This is normally created once for the life of the application and
/// shared, by reference or in an `Arc`, with anything that talks to the
/// hardware.
pub struct PcanBasic {
    api: RwLock<Option<Box<dyn Api>>>,
    bind_error: Option<BindError>,
}

impl PcanBasic {
    /// Binds to the driver library for this platform.
    pub fn new() -> Self {
        Self::with_loader(&LibraryLoader::new())
    }

    /// Binds to the driver with a specific loader.
    ///
    /// The loader is asked exactly once. If it fails, the binding is
    /// permanently invalid.
    pub fn with_loader<L: Loader + ?Sized>(loader: &L) -> Self {
        match loader.load() {
            Ok(api) => {
                info!("PCAN-Basic driver bound");
                Self {
                    api: RwLock::new(Some(api)),
                    bind_error: None,
                }
            }
            Err(err) => {
                warn!("Unable to bind the PCAN-Basic driver: {}", err);
                Self {
                    api: RwLock::new(None),
                    bind_error: Some(err),
                }
            }
        }
    }

    /// Whether every required driver function was resolved, and the
    /// binding has not been released.
    pub fn is_bound(&self) -> bool {
        self.api.read().is_some()
    }

    /// The reason the driver could not be bound, if it couldn't.
    pub fn bind_error(&self) -> Option<&BindError> {
        self.bind_error.as_ref()
    }

    /// Releases the driver library.
    ///
    /// This is safe to call more than once. Any call made afterwards
    /// returns `Status::UNKNOWN`.
    pub fn unbind(&self) {
        if self.api.write().take().is_some() {
            debug!("PCAN-Basic driver released");
        }
    }

    /// Runs a native call, if bound.
    #[inline]
    fn try_call<F>(&self, f: F) -> Option<Status>
    where
        F: FnOnce(&dyn Api) -> Status,
    {
        self.api.read().as_deref().map(f)
    }

    /// Runs a native call, or reports `UNKNOWN` when unbound.
    #[inline]
    fn call<F>(&self, f: F) -> Status
    where
        F: FnOnce(&dyn Api) -> Status,
    {
        self.try_call(f).unwrap_or(Status::UNKNOWN)
    }

    /// Initializes a classic CAN channel.
    ///
    /// The hardware type, I/O port and interrupt are only used by
    /// non-plug-and-play hardware.
    pub fn initialize(
        &self,
        channel: Handle,
        bitrate: Bitrate,
        hw_type: HardwareType,
        io_port: u32,
        interrupt: u16,
    ) -> Status {
        self.call(|api| api.initialize(channel, bitrate.0, hw_type.0, io_port, interrupt))
    }

    /// Initializes an FD channel with a bit rate string, such as
    /// [`DEFAULT_FD_BITRATE`](crate::params::DEFAULT_FD_BITRATE).
    pub fn initialize_fd(&self, channel: Handle, bitrate_fd: &str) -> Status {
        self.call(|api| match CString::new(bitrate_fd) {
            Ok(bitrate_fd) => api.initialize_fd(channel, &bitrate_fd),
            Err(_) => Status::ILLPARAMVAL,
        })
    }

    /// Uninitializes a channel.
    pub fn uninitialize(&self, channel: Handle) -> Status {
        self.call(|api| api.uninitialize(channel))
    }

    /// Resets the receive and transmit queues of a channel.
    pub fn reset(&self, channel: Handle) -> Status {
        self.call(|api| api.reset(channel))
    }

    /// Gets the bus status of a channel.
    pub fn get_status(&self, channel: Handle) -> Status {
        self.call(|api| api.get_status(channel))
    }

    /// Reads a frame from the receive queue of a classic channel.
    ///
    /// The frame and timestamp are present only when the driver delivered
    /// one. See [`Status::carries_frame`].
    pub fn read(&self, channel: Handle) -> (Status, Option<CanFrame>, Option<Timestamp>) {
        let mut msg = TPCANMsg::default();
        let mut ts = TPCANTimestamp::default();
        match self.try_call(|api| api.read(channel, &mut msg, &mut ts)) {
            Some(sts) if sts.carries_frame() => (sts, Some(msg.into()), Some(ts.into())),
            Some(sts) => (sts, None, None),
            None => (Status::UNKNOWN, None, None),
        }
    }

    /// Reads a frame from the receive queue of an FD channel.
    pub fn read_fd(&self, channel: Handle) -> (Status, Option<CanFdFrame>, Option<Timestamp>) {
        let mut msg = TPCANMsgFD::default();
        let mut ts: TPCANTimestampFD = 0;
        match self.try_call(|api| api.read_fd(channel, &mut msg, &mut ts)) {
            Some(sts) if sts.carries_frame() => (sts, Some(msg.into()), Some(ts.into())),
            Some(sts) => (sts, None, None),
            None => (Status::UNKNOWN, None, None),
        }
    }

    /// Transmits a classic frame.
    pub fn write(&self, channel: Handle, frame: &CanFrame) -> Status {
        self.call(|api| api.write(channel, frame.as_raw()))
    }

    /// Transmits an FD frame.
    pub fn write_fd(&self, channel: Handle, frame: &CanFdFrame) -> Status {
        self.call(|api| api.write_fd(channel, frame.as_raw()))
    }

    /// Configures the reception filter to accept an ID range.
    ///
    /// The range is added to any previously configured filter.
    pub fn filter_messages(
        &self,
        channel: Handle,
        from_id: u32,
        to_id: u32,
        mode: MessageType,
    ) -> Status {
        self.call(|api| api.filter_messages(channel, from_id, to_id, mode.bits()))
    }

    /// Reads a parameter into a buffer of the given size.
    pub fn get_value(&self, channel: Handle, parameter: Parameter, size: usize) -> (Status, Vec<u8>) {
        let mut buf = vec![0u8; size];
        let sts = self.call(|api| api.get_value(channel, parameter.0, &mut buf));
        (sts, buf)
    }

    /// Writes a parameter from a buffer.
    pub fn set_value(&self, channel: Handle, parameter: Parameter, buf: &[u8]) -> Status {
        self.call(|api| api.set_value(channel, parameter.0, buf))
    }

    /// Reads a 32-bit integer parameter.
    pub fn get_u32(&self, channel: Handle, parameter: Parameter) -> (Status, u32) {
        let (sts, buf) = self.get_value(channel, parameter, size_of::<u32>());
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&buf[..4]);
        (sts, u32::from_ne_bytes(bytes))
    }

    /// Writes a 32-bit integer parameter.
    pub fn set_u32(&self, channel: Handle, parameter: Parameter, value: u32) -> Status {
        self.set_value(channel, parameter, &value.to_ne_bytes())
    }

    /// Reads a string parameter, such as the API version.
    pub fn get_string(&self, channel: Handle, parameter: Parameter) -> (Status, String) {
        let (sts, buf) = self.get_value(channel, parameter, ffi::MAX_LENGTH_VERSION_STRING);
        (sts, buf_to_string(&buf))
    }

    /// Gets the driver's description of a status code.
    pub fn get_error_text(&self, error: Status, language: Language) -> (Status, String) {
        let mut buf = [0u8; ffi::MAX_LENGTH_ERROR_TEXT];
        let sts = self.call(|api| api.get_error_text(error, language.0, &mut buf));
        (sts, buf_to_string(&buf))
    }

    /// Gets a description of a status code, falling back to a generic
    /// message when the driver can't provide one.
    pub fn formatted_error(&self, error: Status, language: Language) -> String {
        match self.get_error_text(error, language) {
            (sts, text) if sts.is_ok() => text,
            _ => format!(
                "An error occurred. Error-code's text ({:X}h) couldn't be retrieved",
                error
            ),
        }
    }

    /// Finds a channel matching a set of parameters, such as
    /// `"devicetype=pcan_usb, controllernumber=1"`.
    pub fn lookup_channel(&self, parameters: &str) -> (Status, Option<Handle>) {
        let mut handle = ffi::PCAN_NONEBUS;
        let sts = self.call(|api| match CString::new(parameters) {
            Ok(parameters) => api.lookup_channel(&parameters, &mut handle),
            Err(_) => Status::ILLPARAMVAL,
        });
        if sts.is_ok() && handle != ffi::PCAN_NONEBUS {
            (sts, Some(handle))
        } else {
            (sts, None)
        }
    }
}

impl Default for PcanBasic {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PcanBasic {
    fn drop(&mut self) {
        self.unbind();
    }
}

impl fmt::Debug for PcanBasic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PcanBasic")
            .field("bound", &self.is_bound())
            .field("bind_error", &self.bind_error)
            .finish()
    }
}

/////////////////////////////////////////////////////////////////////////////
