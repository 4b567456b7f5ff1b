use crate::error::Outcome;
use log::{debug, error, trace};
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

/// Binds a non-blocking listener on `0.0.0.0:port`.
///
/// The standard library enables address reuse on Unix listeners, so a
/// restarted server can bind again while old connections linger.
pub fn create_listening_socket(port: u16) -> io::Result<TcpListener> {
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))?;
    listener.set_nonblocking(true)?;
    debug!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Polls `listener` for a pending connection.
///
/// `Ok(None)` means nobody is waiting yet. Accepted sockets are switched to
/// non-blocking mode before they are handed out.
pub fn wait_for_connection(listener: &TcpListener) -> io::Result<Option<TcpStream>> {
    match listener.accept() {
        Ok((stream, addr)) => {
            stream.set_nonblocking(true)?;
            stream.set_nodelay(true)?;
            debug!("Accepted connection from {}", addr);
            Ok(Some(stream))
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
            Ok(None)
        }
        Err(e) => {
            error!("Accept failed: {}", e);
            Err(e)
        }
    }
}

/// Local IPv4 address of an accepted connection, announced in PASV replies.
pub fn local_ipv4(stream: &TcpStream) -> Ipv4Addr {
    match stream.local_addr() {
        Ok(SocketAddr::V4(addr)) => *addr.ip(),
        Ok(SocketAddr::V6(addr)) => addr.ip().to_ipv4_mapped().unwrap_or(Ipv4Addr::LOCALHOST),
        Err(_) => Ipv4Addr::LOCALHOST,
    }
}

/// Writes all of `data`, sleeping one millisecond whenever the socket would
/// block, for at most `timeout` in total.
pub fn send_bounded(stream: &mut TcpStream, data: &[u8], timeout: Duration) -> io::Result<()> {
    let started = Instant::now();
    let mut sent = 0;
    while sent < data.len() {
        match stream.write(&data[sent..]) {
            Ok(0) => return Err(io::Error::new(ErrorKind::WriteZero, "peer stopped reading")),
            Ok(n) => sent += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                if started.elapsed() >= timeout {
                    return Err(io::Error::new(ErrorKind::TimedOut, "send timed out"));
                }
                thread::sleep(Duration::from_millis(1));
            }
            Err(e) => return Err(e),
        }
    }
    trace!("Sent {} bytes", sent);
    Ok(())
}

/// Single non-blocking read. A zero-length read means the peer closed the
/// connection and is reported as `Failed`.
pub fn recv_non_blocking(stream: &mut TcpStream, buf: &mut [u8]) -> (Outcome, usize) {
    match stream.read(buf) {
        Ok(0) => (Outcome::Failed, 0),
        Ok(n) => (Outcome::Ok, n),
        Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
            (Outcome::Continue, 0)
        }
        Err(e) => {
            debug!("recv failed: {}", e);
            (Outcome::Failed, 0)
        }
    }
}
