//! NetSocket: TCP client/server connections, framed messaging, and TLS,
//! grounded on `original_source/core/modules/network/netsocket/` and
//! `ssl.c` (`spec.md` §4.8).

pub mod framing;
pub mod server;
pub mod socket;
pub mod state;
pub mod tls;

pub use framing::{FrameError, FRAME_MAGIC_HEAD, FRAME_MAGIC_TAIL, NETMSG_SIZE_LIMIT};
pub use server::{map_io_error, ClientId, NetServer};
pub use socket::{NetSocket, RecursionGuard, WriteQueue};
pub use state::{NetSocketState, StateMachine};
pub use tls::{RustlsProvider, TlsProgress, TlsProvider, TlsSession};
