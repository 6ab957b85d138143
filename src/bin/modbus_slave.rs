//! Modbus Slave host
//!
//! Binds the slave, publishes a few demo registers and drives `tick()` on a
//! fixed period until Ctrl-C.
//!
//! Usage: cargo run --bin modbus-slave -- [OPTIONS]
//! Example: cargo run --bin modbus-slave -- --port 1502 --log-level debug
//!
//! Demo registers (unit 1, FC04):
//! - 0..2: uptime in seconds (u32, low word first, 5 s TTL)
//! - 2: tick period in ms (no TTL)

use std::net::IpAddr;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use modbus_slave::constants::FC_READ_INPUT_REGISTERS;
use modbus_slave::{ModbusServer, ServerConfig};

const DEMO_UNIT: u8 = 1;
const UPTIME_TTL_MS: u32 = 5_000;

#[derive(Debug, Parser)]
#[command(name = "modbus-slave", version, about = "Poll-driven Modbus TCP slave")]
struct Args {
    /// Interface to listen on
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// TCP port
    #[arg(short, long, default_value_t = modbus_slave::DEFAULT_TCP_PORT)]
    port: u16,

    /// Idle clients are dropped after this many milliseconds
    #[arg(long, default_value_t = modbus_slave::DEFAULT_MAX_INACTIVITY_MS)]
    max_inactivity_ms: u64,

    /// Keep Nagle's algorithm enabled on client sockets
    #[arg(long)]
    nagle: bool,

    /// Period between server ticks in milliseconds
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("{}", modbus_slave::info());

    let config = ServerConfig::new()
        .with_bind_address(args.bind)
        .with_port(args.port)
        .with_max_inactivity_ms(args.max_inactivity_ms)
        .with_disable_nagle(!args.nagle);

    let mut server = match ModbusServer::bind(config) {
        Ok(server) => server,
        Err(e) => {
            error!("Cannot start Modbus slave on {}: {}", config.socket_addr(), e);
            return Err(e.into());
        }
    };
    server.dump_config();

    let registers = server.registers();
    registers.set_u16(
        DEMO_UNIT,
        FC_READ_INPUT_REGISTERS,
        2,
        args.tick_ms.min(u64::from(u16::MAX)) as u16,
        0,
    );

    // Application-side writer running on its own task
    let publisher = tokio::spawn(async move {
        let started = Instant::now();
        let mut every_second = interval(Duration::from_secs(1));
        loop {
            every_second.tick().await;
            let uptime = started.elapsed().as_secs() as u32;
            registers.set_u32(DEMO_UNIT, FC_READ_INPUT_REGISTERS, 0, uptime, UPTIME_TTL_MS);
        }
    });

    let mut ticker = interval(Duration::from_millis(args.tick_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => server.tick(),
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("Cannot listen for shutdown signal: {}", e);
                }
                break;
            }
        }
    }

    publisher.abort();
    server.shutdown();
    info!("Modbus slave stopped");
    Ok(())
}
