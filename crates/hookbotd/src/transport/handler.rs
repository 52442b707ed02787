//! Connection handling abstractions for the bot listener.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Stream accepted by the listener.
pub(crate) struct ConnectionStream {
    stream: TcpStream,
}

impl ConnectionStream {
    pub(crate) const fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub(crate) fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }

    /// Bounds each blocking read; `None` waits indefinitely.
    pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    /// Returns `true` when the peer has closed its end of the connection.
    ///
    /// A half-closed peer (write side shut down while still reading) is
    /// indistinguishable from a closed one here and is reported as closed.
    pub(crate) fn peer_closed(&self) -> bool {
        if self.stream.set_nonblocking(true).is_err() {
            return false;
        }
        let mut probe = [0_u8; 1];
        let closed = match self.stream.peek(&mut probe) {
            Ok(0) => true,
            Ok(_) => false,
            Err(error) => !matches!(
                error.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ),
        };
        // A stream left non-blocking would turn the response write into a
        // spurious WouldBlock.
        if self.stream.set_nonblocking(false).is_err() {
            return true;
        }
        closed
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Handles accepted connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::Instant;

    use super::*;

    fn connected_pair() -> (TcpStream, ConnectionStream) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let client = TcpStream::connect(addr).expect("connect client");
        let (server, _) = listener.accept().expect("accept connection");
        (client, ConnectionStream::new(server))
    }

    #[test]
    fn open_peers_are_not_reported_closed() {
        let (_client, server) = connected_pair();
        assert!(!server.peer_closed());
    }

    #[test]
    fn closed_peers_are_detected() {
        let (client, server) = connected_pair();
        drop(client);

        let deadline = Instant::now() + Duration::from_secs(2);
        while !server.peer_closed() {
            assert!(Instant::now() < deadline, "close was never observed");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn unread_bytes_do_not_count_as_closed() {
        let (mut client, mut server) = connected_pair();
        client.write_all(b"x").expect("write byte");
        std::thread::sleep(Duration::from_millis(20));
        assert!(!server.peer_closed());

        let mut byte = [0_u8; 1];
        server.read_exact(&mut byte).expect("byte is still readable");
        assert_eq!(&byte, b"x");
    }
}
