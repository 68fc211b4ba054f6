//! Connection identity and the handle callbacks receive.

use bytes::Bytes;
use std::fmt;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Opaque identity of a live connection.
///
/// Issued by the engine when a connection is accepted and never reused while
/// the server runs. It is only ever compared and hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Requests a `Conn` handle sends to the task that owns the socket.
#[derive(Debug)]
pub(crate) enum Outbound {
    Write(Bytes),
    Close,
}

/// The connection's task has finished; the request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection {0} is closed")]
pub struct ConnClosed(pub ConnId);

/// Handle to one connection, passed to every callback.
///
/// It exposes the connection's identity plus two capabilities, `write` and
/// `close`, both of which are queued to the task that owns the socket and
/// take effect after the current callback returns. Cloning is cheap and
/// clones may be moved to other tasks.
#[derive(Debug, Clone)]
pub struct Conn {
    id: ConnId,
    peer_addr: SocketAddr,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Conn {
    pub(crate) fn new(
        id: ConnId,
        peer_addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            outbound,
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Queues bytes to be written to the peer outside of any reply.
    pub fn write(&self, data: impl Into<Bytes>) -> Result<(), ConnClosed> {
        self.outbound
            .send(Outbound::Write(data.into()))
            .map_err(|_| ConnClosed(self.id))
    }

    /// Asks the engine to close the connection once pending writes are done.
    pub fn close(&self) -> Result<(), ConnClosed> {
        self.outbound
            .send(Outbound::Close)
            .map_err(|_| ConnClosed(self.id))
    }
}

/// Builds a detached handle for unit tests, along with the receiving end of
/// its outbound queue.
#[cfg(test)]
pub(crate) fn test_conn(id: u64) -> (Conn, mpsc::UnboundedReceiver<Outbound>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let addr = SocketAddr::from(([127, 0, 0, 1], 40000 + (id % 20000) as u16));
    (Conn::new(ConnId::new(id), addr, tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_id_display() {
        assert_eq!(ConnId::new(7).to_string(), "#7");
        assert_eq!(ConnId::new(7).as_u64(), 7);
    }

    #[test]
    fn test_write_and_close_are_queued_in_order() {
        let (conn, mut rx) = test_conn(1);
        conn.write(&b"+hello\r\n"[..]).unwrap();
        conn.close().unwrap();

        assert!(matches!(rx.try_recv(), Ok(Outbound::Write(b)) if &b[..] == b"+hello\r\n"));
        assert!(matches!(rx.try_recv(), Ok(Outbound::Close)));
    }

    #[test]
    fn test_capabilities_fail_after_task_is_gone() {
        let (conn, rx) = test_conn(2);
        drop(rx);
        assert_eq!(conn.write(Bytes::from("x")), Err(ConnClosed(ConnId::new(2))));
        assert_eq!(conn.close(), Err(ConnClosed(ConnId::new(2))));
    }
}
