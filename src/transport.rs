//! Network transport layer
//!
//! The connection manager only talks to sockets through [`Acceptor`] and
//! [`Transport`]. Both are implemented for the std TCP types in
//! non-blocking mode; tests substitute scripted in-memory peers.
//!
//! A read or accept that cannot complete reports
//! [`io::ErrorKind::WouldBlock`] (or `Ok(None)` for accept) and the caller
//! simply retries on the next tick.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

use socket2::{Domain, Socket, Type};
use tracing::debug;

/// One accepted byte stream
pub trait Transport: Read + Write {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;

    fn set_nodelay(&self, nodelay: bool) -> io::Result<()>;

    /// Human-readable peer identifier used in logs
    fn peer_id(&self) -> String;

    /// Close both directions
    fn shutdown(&self) -> io::Result<()>;
}

/// Source of new connections
pub trait Acceptor {
    type Transport: Transport;

    /// Non-blocking accept; `Ok(None)` when nothing is pending.
    fn accept(&mut self) -> io::Result<Option<Self::Transport>>;
}

impl Transport for TcpStream {
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        TcpStream::set_nonblocking(self, nonblocking)
    }

    fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        TcpStream::set_nodelay(self, nodelay)
    }

    fn peer_id(&self) -> String {
        self.peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }

    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

impl Acceptor for TcpListener {
    type Transport = TcpStream;

    fn accept(&mut self) -> io::Result<Option<TcpStream>> {
        match TcpListener::accept(self) {
            Ok((stream, _)) => Ok(Some(stream)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Open a non-blocking listening socket.
pub fn bind_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = match addr {
        SocketAddr::V4(_) => Socket::new(Domain::IPV4, Type::STREAM, None)?,
        SocketAddr::V6(_) => Socket::new(Domain::IPV6, Type::STREAM, None)?,
    };
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    socket.set_nonblocking(true)?;

    let listener: TcpListener = socket.into();
    debug!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}
