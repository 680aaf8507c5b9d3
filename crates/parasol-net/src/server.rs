//! Listening sockets: accept loop grounded on the same client state machine
//! each accepted connection uses, matching the original's `server_incoming`
//! callback registered against the listening file descriptor's read watch.

use crate::socket::NetSocket;
use crate::state::NetSocketState;
use parasol_errors::{Error, ErrorKind};
use std::net::{TcpListener, TcpStream};

/// Identifies one client accepted by a [`NetServer`], stable for the
/// lifetime of the connection so callers can track it across `accept_ready`
/// calls without holding onto the raw `TcpStream`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// A server socket: a bound, listening `TcpListener` plus the bookkeeping
/// to hand each accepted peer its own `NetSocket`, per `spec.md` §2's
/// server-mode client list component.
pub struct NetServer {
    listener: TcpListener,
    next_client_id: u64,
    clients: Vec<ClientId>,
}

impl NetServer {
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let listener = TcpListener::bind(addr).map_err(|e| map_io_error(&e))?;
        listener.set_nonblocking(true).map_err(|e| map_io_error(&e))?;
        Ok(Self { listener, next_client_id: 1, clients: Vec::new() })
    }

    pub fn local_addr(&self) -> Result<std::net::SocketAddr, Error> {
        self.listener.local_addr().map_err(|e| map_io_error(&e))
    }

    /// Currently tracked clients, in accept order.
    pub fn clients(&self) -> &[ClientId] {
        &self.clients
    }

    /// Drops a client from the server's tracked list, once its connection
    /// has been torn down. A no-op if `id` is not (or is no longer) tracked.
    pub fn remove_client(&mut self, id: ClientId) {
        self.clients.retain(|&c| c != id);
    }

    /// Accept every connection currently queued, handing back each raw
    /// stream paired with a fresh `NetSocket` already transitioned to
    /// `Connected`, tagged with a [`ClientId`] appended to this server's
    /// tracked client list. Returns an empty vec rather than `WouldBlock`
    /// when nothing is pending, since "no one is waiting" is not an error
    /// for a listening socket.
    pub fn accept_ready(&mut self) -> Result<Vec<(ClientId, TcpStream, NetSocket)>, Error> {
        let mut accepted = Vec::new();
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(true).map_err(|e| map_io_error(&e))?;
                    let mut socket = NetSocket::new();
                    socket.state.transition(NetSocketState::Connected).expect(
                        "a freshly accepted connection always transitions Disconnected -> Connected",
                    );
                    let id = ClientId(self.next_client_id);
                    self.next_client_id += 1;
                    self.clients.push(id);
                    accepted.push((id, stream, socket));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(map_io_error(&e)),
            }
        }
        Ok(accepted)
    }
}

/// Maps a platform socket error to the kernel's error taxonomy, per
/// `spec.md` §4.8's note that NetSocket translates OS error codes into
/// `ErrorKind` values rather than leaking `errno`/`WSAGetLastError`
/// directly to callers.
pub fn map_io_error(e: &std::io::Error) -> Error {
    use std::io::ErrorKind as K;
    let kind = match e.kind() {
        K::ConnectionRefused => ErrorKind::ConnectionRefused,
        K::ConnectionAborted => ErrorKind::ConnectionAborted,
        K::ConnectionReset | K::BrokenPipe | K::NotConnected => ErrorKind::Disconnected,
        K::WouldBlock => ErrorKind::WouldBlock,
        K::TimedOut => ErrorKind::TimeOut,
        K::AddrInUse | K::AddrNotAvailable => ErrorKind::IllegalAddress,
        K::PermissionDenied => ErrorKind::NoPermission,
        K::Unsupported => ErrorKind::NoSupport,
        _ => ErrorKind::InputOutput,
    };
    Error::new(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn accept_ready_picks_up_a_connecting_client() {
        let mut server = NetServer::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();

        let client = TcpStream::connect(addr).unwrap();

        let mut accepted = Vec::new();
        for _ in 0..50 {
            accepted = server.accept_ready().unwrap();
            if !accepted.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(accepted.len(), 1);
        let (id, mut stream, socket) = accepted.into_iter().next().unwrap();
        assert!(socket.is_connected());
        assert_eq!(server.clients(), &[id]);

        stream.write_all(b"hi").unwrap();
        let mut buf = [0u8; 2];
        client_read_exact(&client, &mut buf);
        assert_eq!(&buf, b"hi");

        server.remove_client(id);
        assert!(server.clients().is_empty());
    }

    fn client_read_exact(mut client: &TcpStream, buf: &mut [u8]) {
        client.set_nonblocking(false).unwrap();
        client.read_exact(buf).unwrap();
    }
}
