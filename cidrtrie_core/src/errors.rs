//! Error handling and C-ABI error codes for cidrtrie

use std::cell::RefCell;
use std::fmt;
use std::os::raw::c_char;

/// Error type for trie operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed textual address, mask or prefix length, or an address of
    /// the wrong family.
    BadAddress,
    /// Insert without overwrite onto a prefix that already holds a value.
    NodeBusy,
    /// No such prefix (delete) or no covering prefix (find).
    NotFound,
    /// The arena ran out of `u32` node indices.
    CapacityExceeded,
}

impl Error {
    pub fn as_str(self) -> &'static str {
        match self {
            Error::BadAddress => "bad IP address or mask",
            Error::NodeBusy => "node busy",
            Error::NotFound => "no such node",
            Error::CapacityExceeded => "node capacity exceeded",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for Error {}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    BadAddress = 1,
    NodeBusy = 2,
    NotFound = 3,
    CapacityExceeded = 4,
    InvalidHandle = 5,
    Utf8Error = 6,
    Unknown = 255,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::BadAddress => "Bad IP address or mask",
            ErrorCode::NodeBusy => "Node busy",
            ErrorCode::NotFound => "Not found",
            ErrorCode::CapacityExceeded => "Capacity exceeded",
            ErrorCode::InvalidHandle => "Invalid handle",
            ErrorCode::Utf8Error => "UTF-8 conversion error",
            ErrorCode::Unknown => "Unknown error",
        }
    }

    /// NUL-terminated variant of [`ErrorCode::as_str`] for C callers.
    pub fn as_cstr(self) -> *const c_char {
        let bytes: &'static [u8] = match self {
            ErrorCode::Success => b"Success\0",
            ErrorCode::BadAddress => b"Bad IP address or mask\0",
            ErrorCode::NodeBusy => b"Node busy\0",
            ErrorCode::NotFound => b"Not found\0",
            ErrorCode::CapacityExceeded => b"Capacity exceeded\0",
            ErrorCode::InvalidHandle => b"Invalid handle\0",
            ErrorCode::Utf8Error => b"UTF-8 conversion error\0",
            ErrorCode::Unknown => b"Unknown error\0",
        };
        bytes.as_ptr() as *const c_char
    }
}

// Outcome of the calling thread's most recent C ABI call.
thread_local! {
    static LAST_ERROR: RefCell<ErrorCode> = const { RefCell::new(ErrorCode::Success) };
}

pub fn set_last_error(code: ErrorCode) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = code);
}

pub fn get_last_error() -> ErrorCode {
    LAST_ERROR.with(|cell| *cell.borrow())
}

pub fn map_error(e: &Error) -> ErrorCode {
    match e {
        Error::BadAddress => ErrorCode::BadAddress,
        Error::NodeBusy => ErrorCode::NodeBusy,
        Error::NotFound => ErrorCode::NotFound,
        Error::CapacityExceeded => ErrorCode::CapacityExceeded,
    }
}

impl From<Error> for ErrorCode {
    fn from(e: Error) -> Self {
        map_error(&e)
    }
}
