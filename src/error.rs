use hex::FromHexError;
use openssl::error::ErrorStack;
use std::{error, io};

/// Errors raised by the codec and the store.
///
/// Operational failures carry a free-form diagnostic describing what was
/// expected and what the stream actually contained. Use [`Error::status`] to
/// map an error onto the [`Status`] code surfaced at the handler boundary.
#[derive(Debug)]
pub enum Error {
    IOError(io::Error),
    OpenSSLError(ErrorStack),

    /// The value tag in the stream does not match the expected tag, or an
    /// array advertises an index the destination does not have (or vice
    /// versa).
    TypeMismatch(String),
    /// A block size, item count or end position is inconsistent with the
    /// stream bounds.
    MalformedBlock(String),
    /// A key is too long, or the key in the stream does not match the
    /// expected key.
    KeyMismatch(String),
    /// A typed read ran past the end of the stream.
    EndOfStream(String),
    /// An empty value or null section was found where one is not allowed.
    EmptyNotAllowed(String),
    /// The section or array traversal contract was broken (wrong slot index,
    /// unread slots, section not consumed to its end).
    SyncError(String),
    /// A stream feature this revision does not support (e.g. 64-bit array
    /// indices).
    Unsupported(String),
    /// No registered package recognizes the entity type tag.
    UnknownEntityType(String),
    InvalidParameter(String),
    InvalidState(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IOError(err)
    }
}

impl From<ErrorStack> for Error {
    fn from(err: ErrorStack) -> Self {
        Error::OpenSSLError(err)
    }
}

impl From<FromHexError> for Error {
    fn from(err: FromHexError) -> Self {
        Error::InvalidState(err.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl error::Error for Error {}

impl Error {
    /// Maps the error onto the status code reported at the handler boundary.
    ///
    /// Codec-level failures all collapse into [`Status::Corrupted`], since
    /// from the store's point of view the artifact could not be decoded.
    pub fn status(&self) -> Status {
        match self {
            Error::IOError(err) => match err.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => Status::CantOpen,
                _ => Status::CantRead,
            },
            Error::OpenSSLError(_) => Status::Undefined,
            Error::UnknownEntityType(_) => Status::NotInitialized,
            Error::InvalidParameter(_) => Status::Param,
            Error::InvalidState(_) => Status::Undefined,
            Error::TypeMismatch(_)
            | Error::MalformedBlock(_)
            | Error::KeyMismatch(_)
            | Error::EndOfStream(_)
            | Error::EmptyNotAllowed(_)
            | Error::SyncError(_)
            | Error::Unsupported(_) => Status::Corrupted,
        }
    }
}

/// Status codes surfaced at the entity handler boundary.
///
/// `Ok` and `AlreadyExists` are successes; everything else is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    /// The operation completed.
    Ok = 0,
    /// The object already exists; the existing one is returned.
    AlreadyExists = 1,
    /// Undefined error.
    Undefined = -1,
    /// Invalid parameter in a method call.
    Param = -2,
    /// The system is not initialized (e.g. an entity type is not registered
    /// with any package).
    NotInitialized = -3,
    /// The system or object is already initialized.
    AlreadyInitialized = -4,
    /// Out of memory.
    CantAllocate = -5,
    /// Cannot open a file or handle.
    CantOpen = -6,
    /// Cannot read from a file or handle.
    CantRead = -7,
    /// A file or artifact is corrupted.
    Corrupted = -8,
    /// The object failed validation.
    Invalid = -9,
    /// Cannot write to a file or handle.
    CantWrite = -10,
}

impl Status {
    /// Returns `true` for the non-error statuses (`Ok` and `AlreadyExists`).
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok | Status::AlreadyExists)
    }
}
