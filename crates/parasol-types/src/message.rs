//! Per-task message queue payloads and FD watch registrations
//! (`spec.md` §4.7).

use facet::Facet;
use std::time::Duration;

/// A queued, typed payload delivered to a task's message loop. Derives
/// `Facet` matching the teacher's wire-message convention, so a queued
/// message can be reflected the same way any other tagged value can.
#[derive(Facet, Clone, Debug)]
pub struct Message {
    pub type_id: u32,
    pub timestamp: Duration,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(type_id: u32, timestamp: Duration, payload: impl Into<Vec<u8>>) -> Self {
        Self { type_id, timestamp, payload: payload.into() }
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FdDirection {
    Read,
    Write,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FdFlags: u32 {
        const REMOVE = 1 << 0;
        const SOCKET = 1 << 1;
        const ALLOW_RECURSION = 1 << 2;
    }
}

/// A thin, platform-neutral stand-in for `RawFd`/`RawSocket` so this crate
/// does not have to branch on target OS merely to name the type; the event
/// loop and NetSocket crates convert to the real platform type at the point
/// of use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawFdLike(pub i32);

#[cfg(unix)]
impl From<std::os::unix::io::RawFd> for RawFdLike {
    fn from(fd: std::os::unix::io::RawFd) -> Self {
        Self(fd)
    }
}

/// A registered FD watch. Registration is idempotent by `(fd, direction)`;
/// the event loop keys its internal table the same way.
#[derive(Clone)]
pub struct FdWatch {
    pub fd: RawFdLike,
    pub direction: FdDirection,
    pub flags: FdFlags,
}
