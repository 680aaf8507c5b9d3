//! The framed message wire protocol used by `NetSocket` when message
//! boundaries (rather than a raw byte stream) are required: `spec.md` §6
//! describes each frame as `[magic=0x38184945][length u32 LE][payload]
//! [crc32 u32 LE][magic_tail=0x82FB8334]`, capped at `NETMSG_SIZE_LIMIT` to
//! bound the receive buffer a hostile or broken peer could force us to grow.
//!
//! Framing errors follow the `Display`/`From` conventions used for
//! `WireError` elsewhere in this workspace: a small enum with a textual
//! `Display` impl rather than relying on `std::io::Error::other`.

use std::fmt;

pub const FRAME_MAGIC_HEAD: u32 = 0x3818_4945;
pub const FRAME_MAGIC_TAIL: u32 = 0x82FB_8334;
pub const NETMSG_SIZE_LIMIT: usize = 1024 * 1024;
const HEADER_LEN: usize = 8; // magic + length
const FOOTER_LEN: usize = 8; // crc32 + magic_tail

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Header or footer magic did not match; the stream is desynchronised.
    BadMagic,
    /// The declared payload length exceeds `NETMSG_SIZE_LIMIT`.
    TooLarge { declared: usize },
    /// Fewer bytes were supplied than the frame claims to need.
    Truncated { needed: usize, have: usize },
    /// The trailing CRC32 did not match the payload.
    ChecksumMismatch,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::BadMagic => write!(f, "frame magic mismatch"),
            FrameError::TooLarge { declared } => {
                write!(f, "frame payload of {declared} bytes exceeds the {NETMSG_SIZE_LIMIT} byte limit")
            }
            FrameError::Truncated { needed, have } => {
                write!(f, "frame needs {needed} bytes but only {have} are buffered")
            }
            FrameError::ChecksumMismatch => write!(f, "frame checksum mismatch"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<FrameError> for parasol_errors::Error {
    fn from(e: FrameError) -> Self {
        use parasol_errors::ErrorKind;
        let kind = match e {
            FrameError::BadMagic => ErrorKind::InvalidData,
            FrameError::TooLarge { .. } => ErrorKind::DataSize,
            FrameError::Truncated { .. } => ErrorKind::WouldBlock,
            FrameError::ChecksumMismatch => ErrorKind::InvalidData,
        };
        parasol_errors::Error::new(kind)
    }
}

/// Encode `payload` into a complete frame, ready to hand to a `WriteQueue`.
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + FOOTER_LEN);
    out.extend_from_slice(&FRAME_MAGIC_HEAD.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&crc32(payload).to_le_bytes());
    out.extend_from_slice(&FRAME_MAGIC_TAIL.to_le_bytes());
    out
}

/// The outcome of attempting to decode one frame from a buffer that may
/// hold only part of it (or several frames back to back).
pub struct Decoded<'a> {
    pub payload: &'a [u8],
    /// Number of bytes of `buf` this frame consumed; the caller drains
    /// exactly this many bytes before attempting to decode the next frame.
    pub consumed: usize,
}

/// Attempt to decode a single frame from the front of `buf`. Returns
/// `Ok(None)` when `buf` does not yet hold a complete frame (the caller
/// should keep reading), `Err` for any other failure.
pub fn decode(buf: &[u8]) -> Result<Option<Decoded<'_>>, FrameError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    if magic != FRAME_MAGIC_HEAD {
        return Err(FrameError::BadMagic);
    }
    let declared = u32::from_le_bytes(buf[4..8].try_into().unwrap()) as usize;
    if declared > NETMSG_SIZE_LIMIT {
        return Err(FrameError::TooLarge { declared });
    }
    let total = HEADER_LEN + declared + FOOTER_LEN;
    if buf.len() < total {
        return Ok(None);
    }
    let payload = &buf[HEADER_LEN..HEADER_LEN + declared];
    let crc_bytes = &buf[HEADER_LEN + declared..HEADER_LEN + declared + 4];
    let tail_bytes = &buf[HEADER_LEN + declared + 4..total];
    let expected_crc = u32::from_le_bytes(crc_bytes.try_into().unwrap());
    let tail_magic = u32::from_le_bytes(tail_bytes.try_into().unwrap());
    if tail_magic != FRAME_MAGIC_TAIL {
        return Err(FrameError::BadMagic);
    }
    if crc32(payload) != expected_crc {
        return Err(FrameError::ChecksumMismatch);
    }
    Ok(Some(Decoded { payload, consumed: total }))
}

/// CRC-32 (IEEE 802.3 polynomial, reflected), computed with a 256-entry
/// table built once at first use. No `crc` crate is part of the workspace
/// dependency set, so this is hand-rolled the way small leaf utilities are
/// elsewhere in this codebase.
fn crc32(data: &[u8]) -> u32 {
    static TABLE: std::sync::OnceLock<[u32; 256]> = std::sync::OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = i as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
            *entry = crc;
        }
        table
    });

    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        let idx = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ table[idx];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_payload() {
        let frame = encode(b"PING");
        let decoded = decode(&frame).unwrap().unwrap();
        assert_eq!(decoded.payload, b"PING");
        assert_eq!(decoded.consumed, frame.len());
    }

    #[test]
    fn reports_incomplete_frame_as_none() {
        let frame = encode(b"hello world");
        assert!(decode(&frame[..frame.len() - 1]).unwrap().is_none());
        assert!(decode(&frame[..4]).unwrap().is_none());
    }

    #[test]
    fn rejects_bad_header_magic() {
        let mut frame = encode(b"x");
        frame[0] ^= 0xFF;
        assert_eq!(decode(&frame).unwrap_err(), FrameError::BadMagic);
    }

    #[test]
    fn rejects_corrupted_payload_via_checksum() {
        let mut frame = encode(b"hello");
        let payload_start = HEADER_LEN;
        frame[payload_start] ^= 0x01;
        assert_eq!(decode(&frame).unwrap_err(), FrameError::ChecksumMismatch);
    }

    #[test]
    fn rejects_declared_length_over_the_limit() {
        let mut header = Vec::new();
        header.extend_from_slice(&FRAME_MAGIC_HEAD.to_le_bytes());
        header.extend_from_slice(&((NETMSG_SIZE_LIMIT + 1) as u32).to_le_bytes());
        assert_eq!(decode(&header).unwrap_err(), FrameError::TooLarge { declared: NETMSG_SIZE_LIMIT + 1 });
    }

    #[test]
    fn decodes_back_to_back_frames_from_one_buffer() {
        let mut buf = encode(b"one");
        buf.extend(encode(b"two"));
        let first = decode(&buf).unwrap().unwrap();
        assert_eq!(first.payload, b"one");
        let rest = &buf[first.consumed..];
        let second = decode(rest).unwrap().unwrap();
        assert_eq!(second.payload, b"two");
    }
}
