//! End-to-end tests against a real listening socket.
//!
//! The server is ticked on its own thread; clients are plain blocking
//! `std::net::TcpStream`s.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use modbus_slave::{RegisterHandle, ServerConfig};

struct RunningServer {
    addr: SocketAddr,
    registers: RegisterHandle,
    connections: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RunningServer {
    fn start(config: ServerConfig) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let connections = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        let thread = {
            let stop = stop.clone();
            let connections = connections.clone();
            thread::spawn(move || {
                let mut server = modbus_slave::ModbusServer::bind(config).unwrap();
                tx.send((server.local_addr().unwrap(), server.registers()))
                    .unwrap();
                while !stop.load(Ordering::SeqCst) {
                    server.tick();
                    connections.store(server.connection_count(), Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                }
                server.shutdown();
            })
        };

        let (addr, registers) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        Self {
            addr,
            registers,
            connections,
            stop,
            thread: Some(thread),
        }
    }

    fn local() -> Self {
        Self::start(
            ServerConfig::new()
                .with_bind_address("127.0.0.1".parse().unwrap())
                .with_port(0),
        )
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream.set_nodelay(true).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn read_request(transaction: u16, unit: u8, function: u8, address: u16, count: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(12);
    frame.extend_from_slice(&transaction.to_be_bytes());
    frame.extend_from_slice(&[0, 0, 0, 6, unit, function]);
    frame.extend_from_slice(&address.to_be_bytes());
    frame.extend_from_slice(&count.to_be_bytes());
    frame
}

fn roundtrip(stream: &mut TcpStream, request: &[u8], response_len: usize) -> Vec<u8> {
    stream.write_all(request).unwrap();
    let mut response = vec![0u8; response_len];
    stream.read_exact(&mut response).unwrap();
    response
}

fn assert_closed_by_server(stream: &mut TcpStream) {
    let mut buf = [0u8; 16];
    match stream.read(&mut buf) {
        Ok(0) => {}
        Ok(n) => panic!("expected EOF, got {} bytes", n),
        Err(e) => assert!(
            matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
            ),
            "unexpected error {e}"
        ),
    }
}

#[test]
fn test_read_single_holding_register() {
    let server = RunningServer::local();
    server.registers.set_u16(1, 3, 100, 1234, 0);

    let mut client = server.connect();
    let response = roundtrip(&mut client, &read_request(7, 1, 3, 100, 1), 11);
    assert_eq!(response, vec![0, 7, 0, 0, 0, 5, 1, 3, 2, 0x04, 0xD2]);
}

#[test]
fn test_missing_address_exception() {
    let server = RunningServer::local();

    let mut client = server.connect();
    let response = roundtrip(&mut client, &read_request(3, 1, 3, 999, 1), 9);
    assert_eq!(response, vec![0, 3, 0, 0, 0, 3, 1, 0x83, 0x02]);

    // connection survives an exception
    server.registers.set_u16(1, 3, 999, 5, 0);
    let response = roundtrip(&mut client, &read_request(4, 1, 3, 999, 1), 11);
    assert_eq!(&response[9..], &[0, 5]);
}

#[test]
fn test_input_registers_with_int32() {
    let server = RunningServer::local();
    server.registers.set_i32(2, 4, 10, -2, 0);
    server.registers.set_u16(2, 4, 12, 0xBEEF, 0);

    let mut client = server.connect();
    let response = roundtrip(&mut client, &read_request(1, 2, 4, 10, 4), 9 + 8);
    assert_eq!(&response[..9], &[0, 1, 0, 0, 0, 11, 2, 4, 8]);
    assert_eq!(&response[9..], &[0xFF, 0xFE, 0xFF, 0xFF, 0xBE, 0xEF, 0, 0]);
}

#[test]
fn test_byte_by_byte_delivery() {
    let server = RunningServer::local();
    server.registers.set_u16(1, 3, 100, 1234, 0);

    let mut client = server.connect();
    for byte in read_request(7, 1, 3, 100, 1) {
        client.write_all(&[byte]).unwrap();
        thread::sleep(Duration::from_millis(3));
    }
    let mut response = [0u8; 11];
    client.read_exact(&mut response).unwrap();
    assert_eq!(response, [0, 7, 0, 0, 0, 5, 1, 3, 2, 0x04, 0xD2]);
}

#[test]
fn test_bad_client_does_not_affect_others() {
    let server = RunningServer::local();
    server.registers.set_u16(1, 3, 0, 42, 0);

    let mut good = server.connect();
    let mut bad = server.connect();
    assert!(wait_until(|| server.connection_count() == 2));

    // declared body length 0x0200 > 100
    bad.write_all(&[0, 1, 0, 0, 0x02, 0x00]).unwrap();
    assert_closed_by_server(&mut bad);

    let response = roundtrip(&mut good, &read_request(9, 1, 3, 0, 1), 11);
    assert_eq!(&response[9..], &[0, 42]);
    assert!(wait_until(|| server.connection_count() == 1));
}

#[test]
fn test_idle_client_evicted() {
    let server = RunningServer::start(
        ServerConfig::new()
            .with_bind_address("127.0.0.1".parse().unwrap())
            .with_port(0)
            .with_max_inactivity_ms(100),
    );

    let mut client = server.connect();
    assert!(wait_until(|| server.connection_count() == 1));
    assert!(wait_until(|| server.connection_count() == 0));
    assert_closed_by_server(&mut client);
}

#[test]
fn test_shutdown_closes_clients() {
    let mut server = RunningServer::local();
    let mut client = server.connect();
    assert!(wait_until(|| server.connection_count() == 1));

    server.stop();
    assert_closed_by_server(&mut client);
}
