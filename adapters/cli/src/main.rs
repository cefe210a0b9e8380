#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line frame driver for orca programs.

mod clock;
mod driver;
mod transport;

use std::{fs, path::PathBuf, thread, time::Instant};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use orca_grid::{Grid, DEFAULT_SEED};
use orca_system_io::{
    Io, IoConfig, Transport, DEFAULT_CC_OFFSET, DEFAULT_IP, DEFAULT_OSC_PORT, DEFAULT_UDP_OUTPUT,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    clock::Clock,
    driver::Driver,
    transport::{Listener, NetTransport},
};

/// Runs an orca program for a number of frames.
#[derive(Debug, Parser)]
#[command(name = "orca", version, about)]
struct CliArgs {
    /// Program file to load.
    file: PathBuf,
    /// Number of frames to run.
    #[arg(long, default_value_t = 16)]
    frames: u64,
    /// Seed for the random operator.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Initial tempo in beats per minute.
    #[arg(long, default_value_t = 120)]
    bpm: u32,
    /// Waits one quarter beat between frames.
    #[arg(long)]
    realtime: bool,
    /// Grid width; defaults to the program's first row.
    #[arg(long)]
    width: Option<u32>,
    /// Grid height; defaults to the program's row count.
    #[arg(long)]
    height: Option<u32>,
    /// Destination address for OSC and UDP.
    #[arg(long, default_value = DEFAULT_IP)]
    ip: String,
    /// OSC output port.
    #[arg(long, default_value_t = DEFAULT_OSC_PORT)]
    osc_port: u16,
    /// UDP output port.
    #[arg(long, default_value_t = DEFAULT_UDP_OUTPUT)]
    udp_port: u16,
    /// Offset added to every control change index.
    #[arg(long, default_value_t = DEFAULT_CC_OFFSET)]
    cc_offset: u8,
    /// Reads command messages from this UDP port.
    #[arg(long)]
    listen: Option<u16>,
    /// Sends datagrams instead of only logging them.
    #[arg(long)]
    send: bool,
    /// Writes the final grid here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orca=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let (columns, rows) = Grid::to_rect(&source);
    let width = args.width.unwrap_or(u32::try_from(columns)?);
    let height = args.height.unwrap_or(u32::try_from(rows)?);
    ensure!(width > 0 && height > 0, "{} holds no program", args.file.display());

    let mut grid = Grid::with_seed(width, height, args.seed);
    grid.load(width, height, &source);
    info!(width, height, file = %args.file.display(), "program loaded");

    let mut config = IoConfig::default()
        .with_ip(args.ip.clone())
        .with_osc_port(args.osc_port)
        .with_udp_output(args.udp_port)
        .with_cc_offset(args.cc_offset);
    if let Some(port) = args.listen {
        config = config.with_udp_input(port);
    }

    let mut transport = if args.send {
        NetTransport::connected()?
    } else {
        NetTransport::dry()
    };
    let mut listener = args.listen.map(Listener::bind).transpose()?;
    let mut driver = Driver::new(grid, Io::new(config), Clock::new(args.bpm));

    run(&args, &mut driver, &mut listener, &mut transport);
    let _ = driver.silence(&mut transport);

    let rendered = driver.grid().format();
    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn run(
    args: &CliArgs,
    driver: &mut Driver,
    listener: &mut Option<Listener>,
    transport: &mut dyn Transport,
) {
    let mut remaining = args.frames;
    while remaining > 0 {
        let started = Instant::now();
        if let Some(active) = listener {
            for message in active.drain() {
                let _ = driver.receive(&message, transport);
            }
        }
        rebind(driver, listener);

        if driver.clock().is_paused() {
            if !args.realtime || listener.is_none() {
                info!(frame = driver.grid().frame(), "stopped by command");
                return;
            }
        } else {
            let _ = driver.frame(transport);
            remaining -= 1;
        }

        if args.realtime {
            if let Some(rest) = driver.clock().period().checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
    }
}

/// Moves the listener when a command selected another input port.
fn rebind(driver: &Driver, listener: &mut Option<Listener>) {
    let Some(active) = listener else {
        return;
    };
    let port = driver.io().config().udp_input();
    if active.port() == port {
        return;
    }
    match Listener::bind(port) {
        Ok(moved) => *active = moved,
        Err(error) => warn!(%error, port, "listener kept on its previous port"),
    }
}
