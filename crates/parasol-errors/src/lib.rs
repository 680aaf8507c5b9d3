//! The universal error taxonomy shared by every kernel subsystem.
//!
//! Every fallible kernel operation returns a [`Status`]: `Ok(())` on success,
//! or `Err(Error)` carrying an [`ErrorKind`] plus a set of [`ErrorFlags`].
//! Two out-of-band bits modulate how the caller should react to a failure —
//! `DELAY` asks for a retry, `NOTIFIED` marks a failure that has already been
//! surfaced to a user so further logging would be redundant. The source
//! framework ORs these bits into the numeric return code; Rust has no spare
//! bits to steal from an enum discriminant, so they travel alongside the
//! kind instead.

pub mod log;

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Out-of-band modifiers that can accompany any [`ErrorKind`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ErrorFlags: u32 {
        /// Ask the caller to retry the operation later; this is not a terminal failure.
        const DELAY = 1 << 0;
        /// The failure has already been surfaced to the user; suppress further logging.
        const NOTIFIED = 1 << 1;
    }
}

/// The closed set of kernel error kinds, transcribed from the original
/// framework's `system/errors.h`. Numeric values are preserved so that they
/// remain meaningful when cross-referenced against the original source or
/// wire-level diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
#[non_exhaustive]
pub enum ErrorKind {
    // ---- status / control flow ----
    Okay = 0,
    False = 1,
    LimitedSuccess = 2,
    Cancelled = 3,
    NothingDone = 4,
    Continue = 5,
    Skip = 6,
    Retry = 7,
    DirEmpty = 8,
    Terminate = 9,

    // ---- resource ----
    NoMemory = 10,
    NoPointer = 11,
    InUse = 12,
    Failed = 13,
    File = 14,
    InvalidData = 15,
    Search = 16,
    InitModule = 17,
    FileNotFound = 18,
    WrongVersion = 19,

    // ---- validation ----
    Args = 20,
    NoData = 21,
    Read = 22,
    Write = 23,
    LockFailed = 24,
    ExamineFailed = 25,
    LostClass = 26,
    NoAction = 27,
    NoSupport = 28,
    Memory = 29,
    TimeOut = 30,
    NoStats = 31,
    LowCapacity = 32,
    Init = 33,
    NoPermission = 34,
    SystemCorrupt = 35,
    NeedOwner = 36,
    OwnerNeedsBitmap = 37,
    CoreVersion = 38,
    NeedWidthHeight = 39,
    NegativeSubClassID = 40,
    NegativeClassID = 41,
    MissingClassName = 42,
    OutOfRange = 43,
    ObtainMethod = 44,
    ArrayFull = 45,
    Query = 46,
    LostOwner = 47,
    DoNotExpunge = 48,
    MemoryCorrupt = 49,
    FieldSearch = 50,
    InvalidPath = 51,
    SetField = 52,
    MarkedForDeletion = 53,
    IllegalMethodID = 54,
    IllegalActionID = 55,
    ModuleOpenFailed = 56,
    IllegalActionAttempt = 57,
    EntryMissingHeader = 58,
    ModuleMissingInit = 59,
    ModuleInitFailed = 60,
    MemoryDoesNotExist = 61,
    DeadLock = 62,
    SystemLocked = 63,
    ModuleMissingName = 64,
    AddClass = 65,
    Activate = 66,
    DoubleInit = 67,
    UndefinedField = 68,
    MissingClass = 69,
    FileReadFlag = 70,
    FileWriteFlag = 71,
    Draw = 72,
    NoMethods = 73,
    NoMatchingObject = 74,
    AccessMemory = 75,
    MissingPath = 76,
    NotLocked = 77,
    NoSearchResult = 78,
    StatementUnsatisfied = 79,
    ObjectCorrupt = 80,
    OwnerPassThrough = 81,
    UnsupportedOwner = 82,
    ExclusiveDenied = 83,
    AllocMemory = 84,
    NewObject = 85,
    GetField = 86,
    NoFieldAccess = 87,
    VirtualVolume = 88,
    InvalidDimension = 89,
    FieldTypeMismatch = 90,
    UnrecognisedFieldType = 91,
    BufferOverflow = 92,
    UnsupportedField = 93,
    Mismatch = 94,
    OutOfBounds = 95,
    Seek = 96,
    ReallocMemory = 97,
    Loop = 98,
    FileExists = 99,
    ResolvePath = 100,
    CreateObject = 101,
    MemoryInfo = 102,
    NotInitialised = 103,
    ResourceExists = 104,
    Refresh = 105,
    ListChildren = 106,
    SystemCall = 107,
    SmallMask = 108,
    EmptyString = 109,
    ObjectExists = 110,
    ExpectedFile = 111,
    Resize = 112,
    Redimension = 113,
    AllocSemaphore = 114,
    AccessSemaphore = 115,
    CreateFile = 116,
    DeleteFile = 117,
    OpenFile = 118,
    ReadOnly = 119,
    DoesNotExist = 120,
    IdenticalPaths = 121,
    Exists = 122,
    SanityFailure = 123,
    OutOfSpace = 124,
    GetSurfaceInfo = 125,
    Finished = 126,
    Syntax = 127,
    InvalidState = 128,
    HostNotFound = 129,
    InvalidURI = 130,

    // ---- network ----
    ConnectionRefused = 131,
    NetworkUnreachable = 132,
    HostUnreachable = 133,
    Disconnected = 134,
    TaskStillExists = 135,
    IntegrityViolation = 136,
    SchemaViolation = 137,
    DataSize = 138,
    Busy = 139,
    ConnectionAborted = 140,
    NullArgs = 141,
    InvalidObject = 142,
    ExecViolation = 143,
    Recursion = 144,
    IllegalAddress = 145,

    // ---- parse / format ----
    UnbalancedXML = 146,
    WouldBlock = 147,
    InputOutput = 148,
    LoadModule = 149,
    InvalidHandle = 150,
    Security = 151,
    InvalidValue = 152,
    ServiceUnavailable = 153,
    Deactivated = 154,
    LockRequired = 155,
    AlreadyLocked = 156,
    CardReaderUnknown = 157,
    NoMediaInserted = 158,
    CardReaderUnavailable = 159,
    ProxySSLTunnel = 160,
    InvalidHTTPResponse = 161,
    InvalidReference = 162,
    Exception = 163,
    ThreadAlreadyActive = 164,
    OpenGL = 165,
    OutsideMainThread = 166,
    UseSubClass = 167,
    WrongType = 168,
    ThreadNotLocked = 169,
    LockMutex = 170,
    SetVolume = 171,
    Decompression = 172,
    Compression = 173,
    ExpectedFolder = 174,
    Immutable = 175,
    ReadFileToBuffer = 176,
    Obsolete = 177,
    CreateResource = 178,
    NotPossible = 179,
    ResolveSymbol = 180,
    Function = 181,
    AlreadyDefined = 182,
    SetValueNotNumeric = 183,
    SetValueNotString = 184,
    SetValueNotObject = 185,
    SetValueNotFunction = 186,
    SetValueNotPointer = 187,
    SetValueNotArray = 188,
    SetValueNotLookup = 189,

    /// Sentinel marking the end of the enumerated range; never returned.
    End = 190,
}

impl ErrorKind {
    // ---- aliases: distinct names the original framework used for the same code ----
    pub const TRUE: ErrorKind = ErrorKind::Okay;
    pub const EXCEPTION_THRESHOLD: ErrorKind = ErrorKind::Terminate;
    pub const NOT_FOUND: ErrorKind = ErrorKind::Search;
    pub const FILE_DOES_NOT_EXIST: ErrorKind = ErrorKind::FileNotFound;
    pub const LOCK: ErrorKind = ErrorKind::LockFailed;
    pub const PERMISSIONS: ErrorKind = ErrorKind::NoPermission;
    pub const PERMISSION_DENIED: ErrorKind = ErrorKind::NoPermission;
    pub const FIELD_NOT_SET: ErrorKind = ErrorKind::UndefinedField;
    pub const BAD_OWNER: ErrorKind = ErrorKind::UnsupportedOwner;
    pub const ACCESS_OBJECT: ErrorKind = ErrorKind::ExclusiveDenied;
    pub const CONSTRAINT_VIOLATION: ErrorKind = ErrorKind::IntegrityViolation;
    pub const WRONG_OBJECT_TYPE: ErrorKind = ErrorKind::InvalidObject;
    pub const WRONG_CLASS: ErrorKind = ErrorKind::InvalidObject;
    pub const EOF: ErrorKind = ErrorKind::Finished;
    pub const END_OF_FILE: ErrorKind = ErrorKind::Finished;
    pub const OUT_OF_DATA: ErrorKind = ErrorKind::Finished;
    pub const STRING_FORMAT: ErrorKind = ErrorKind::Syntax;
    pub const LOCKED: ErrorKind = ErrorKind::AlreadyLocked;

    /// Whether this kind represents overall success (`Okay` or `False`, both
    /// of which are non-error boolean-style results in the original taxonomy).
    pub fn is_ok(self) -> bool {
        matches!(self, ErrorKind::Okay | ErrorKind::False)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A kernel error: a kind plus the `DELAY`/`NOTIFIED` modifier bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    pub kind: ErrorKind,
    pub flags: ErrorFlags,
}

impl Error {
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind, flags: ErrorFlags::empty() }
    }

    pub const fn delayed(kind: ErrorKind) -> Self {
        Self { kind, flags: ErrorFlags::DELAY }
    }

    pub fn notified(mut self) -> Self {
        self.flags |= ErrorFlags::NOTIFIED;
        self
    }

    pub fn is_delay(&self) -> bool {
        self.flags.contains(ErrorFlags::DELAY)
    }

    pub fn is_notified(&self) -> bool {
        self.flags.contains(ErrorFlags::NOTIFIED)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.is_delay() {
            write!(f, " (delay)")?;
        }
        if self.is_notified() {
            write!(f, " (notified)")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// The return type of every kernel operation.
pub type Status = Result<(), Error>;

/// Shorthand for constructing a failing [`Status`] from a bare [`ErrorKind`].
pub fn err(kind: ErrorKind) -> Status {
    Err(Error::new(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_share_discriminant() {
        assert_eq!(ErrorKind::TRUE as i32, ErrorKind::Okay as i32);
        assert_eq!(ErrorKind::NOT_FOUND as i32, ErrorKind::Search as i32);
        assert_eq!(ErrorKind::LOCKED as i32, ErrorKind::AlreadyLocked as i32);
    }

    #[test]
    fn error_flags_round_trip() {
        let e = Error::delayed(ErrorKind::WouldBlock).notified();
        assert!(e.is_delay());
        assert!(e.is_notified());
        assert_eq!(e.kind, ErrorKind::WouldBlock);
    }

    #[test]
    fn okay_and_false_are_ok() {
        assert!(ErrorKind::Okay.is_ok());
        assert!(ErrorKind::False.is_ok());
        assert!(!ErrorKind::Failed.is_ok());
    }
}
