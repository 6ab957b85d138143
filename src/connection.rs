//! Connection manager
//!
//! Owns every live client connection and drives them once per tick:
//!
//! ```text
//! Accepted ─► AwaitingHeader ─► AwaitingBody ─► Responding ─┐
//!                  ▲                                        │
//!                  └────────────────────────────────────────┘
//!
//!  any state ──(peer close | read error | oversized | short write | idle)──► Closing
//! ```
//!
//! Closing connections are dropped by [`ConnectionManager::cleanup`] in one
//! order-preserving pass.

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::constants::MAX_BODY_LEN;
use crate::decoder::{DecodeStatus, FrameDecoder};
use crate::liveness::Watchdog;
use crate::processor::{self, Reply};
use crate::register::RegisterHandle;
use crate::transport::{Acceptor, Transport};
use crate::utils::HexDump;

/// A single client
pub struct Connection<T> {
    transport: T,
    peer_id: String,
    decoder: FrameDecoder,
    last_activity: u64,
    closing: bool,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, peer_id: String, now_ms: u64) -> Self {
        Self {
            transport,
            peer_id,
            decoder: FrameDecoder::new(),
            last_activity: now_ms,
            closing: false,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    pub fn last_activity(&self) -> u64 {
        self.last_activity
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Frame, answer and reply to at most one request.
    pub fn service(
        &mut self,
        registers: &RegisterHandle,
        clock: &dyn Clock,
        watchdog: &mut dyn Watchdog,
    ) {
        let len = match self.decoder.poll(&mut self.transport, watchdog) {
            DecodeStatus::Pending => return,
            DecodeStatus::Complete(len) => len,
            DecodeStatus::PeerClosed(phase) => {
                info!("Client {} sent no {}", self.peer_id, phase);
                self.closing = true;
                return;
            }
            DecodeStatus::Failed(phase, e) => {
                error!("Client {} {}, error: {}", self.peer_id, phase, e);
                self.closing = true;
                return;
            }
            DecodeStatus::Oversized(len) => {
                error!("Message length {} > {}", len, MAX_BODY_LEN);
                self.closing = true;
                return;
            }
        };

        self.last_activity = clock.now_ms();
        let frame = self.decoder.frame();
        debug!("Received {} bytes {}", len, HexDump(frame));

        let reply = processor::process(frame, &registers.lock());
        if let Some(adu) = reply.adu() {
            match &reply {
                Reply::Exception { code, .. } => {
                    error!("Sending error {}: {}", code, HexDump(adu))
                }
                _ => debug!("Sending response {}", HexDump(adu)),
            }

            match self.transport.write(adu) {
                Ok(sent) if sent == adu.len() => {}
                Ok(sent) => {
                    error!(
                        "Sending response to {} failed, wrote {} of {} bytes",
                        self.peer_id,
                        sent,
                        adu.len()
                    );
                    self.closing = true;
                }
                Err(e) => {
                    error!("Sending response to {} failed, error: {}", self.peer_id, e);
                    self.closing = true;
                }
            }
        }

        self.decoder.reset();
    }
}

/// The set of live connections plus the listener feeding it
pub struct ConnectionManager<A: Acceptor> {
    acceptor: A,
    connections: Vec<Connection<A::Transport>>,
    clock: Arc<dyn Clock>,
    max_inactivity_ms: u64,
    disable_nagle: bool,
}

impl<A: Acceptor> ConnectionManager<A> {
    pub fn new(acceptor: A, clock: Arc<dyn Clock>, max_inactivity_ms: u64, disable_nagle: bool) -> Self {
        Self {
            acceptor,
            connections: Vec::new(),
            clock,
            max_inactivity_ms,
            disable_nagle,
        }
    }

    pub fn acceptor(&self) -> &A {
        &self.acceptor
    }

    pub fn acceptor_mut(&mut self) -> &mut A {
        &mut self.acceptor
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Peer ids in service order
    pub fn peers(&self) -> impl Iterator<Item = &str> {
        self.connections.iter().map(Connection::peer_id)
    }

    /// Take at most one pending client off the listener.
    pub fn accept(&mut self) {
        let transport = match self.acceptor.accept() {
            Ok(Some(transport)) => transport,
            Ok(None) => return,
            Err(e) => {
                warn!("Accept failed: {}", e);
                return;
            }
        };

        if let Err(e) = transport.set_nonblocking(true) {
            error!("Cannot make client socket non-blocking: {}", e);
            return;
        }
        if let Err(e) = transport.set_nodelay(self.disable_nagle) {
            warn!("Cannot set TCP_NODELAY: {}", e);
        }

        let peer_id = transport.peer_id();
        info!(
            "New client #{} connected from {}",
            self.connections.len() + 1,
            peer_id
        );
        self.connections
            .push(Connection::new(transport, peer_id, self.clock.now_ms()));
    }

    /// Give every open connection one pass through decode, process, respond.
    pub fn service(&mut self, registers: &RegisterHandle, watchdog: &mut dyn Watchdog) {
        let clock = self.clock.as_ref();
        for connection in self.connections.iter_mut().filter(|c| !c.closing) {
            connection.service(registers, clock, watchdog);
        }
    }

    /// Mark idle connections closing, then drop every closing connection.
    pub fn cleanup(&mut self) {
        let now = self.clock.now_ms();
        for connection in &mut self.connections {
            let idle = now.saturating_sub(connection.last_activity);
            if !connection.closing && idle > self.max_inactivity_ms {
                warn!(
                    "Client {} inactive for {} s",
                    connection.peer_id,
                    idle / 1000
                );
                connection.closing = true;
            }
        }

        let before = self.connections.len();
        self.connections.retain(|c| !c.closing);
        if before != self.connections.len() {
            info!("{} clients connected", self.connections.len());
        }
    }

    /// Shut down both directions of every connection and forget them.
    pub fn shutdown(&mut self) {
        for connection in self.connections.drain(..) {
            if let Err(e) = connection.transport.shutdown() {
                debug!("Shutdown of {} failed: {}", connection.peer_id, e);
            }
        }
    }
}
