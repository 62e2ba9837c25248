use std::time::Duration;

use clap::Parser;
use tinymod_core::{Outcome, Slave, SlaveConfig, StationId};
use tinymod_link::{RegisterBank, SerialConfig, SerialLink, SystemClock};
use tinymod_tools::common::{init_tracing, parse_station, SerialConnectionArgs};
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "slavesim",
    about = "Serve an in-memory holding-register bank on a serial port"
)]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    #[arg(long, default_value = "1", value_parser = parse_station)]
    station: StationId,
    #[arg(long, default_value_t = 64)]
    registers: usize,
    #[arg(long, default_value_t = 0)]
    base: u16,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let link = SerialLink::open(&args.conn.port, args.conn.baud, SerialConfig::default())?;
    let mut bank = RegisterBank::with_base(args.registers, args.base);
    let mut slave = Slave::new(
        link,
        SystemClock::new(),
        SlaveConfig::new(args.station),
    );

    info!(
        port = %args.conn.port,
        station = args.station.as_u8(),
        registers = args.registers,
        base = args.base,
        "serving holding registers"
    );

    loop {
        let mut table = bank.table();
        match slave.poll(&mut table) {
            Outcome::Served => debug!("request served"),
            Outcome::NotAddressed => debug!("frame for another station"),
            Outcome::ProtocolError => warn!("frame dropped"),
            Outcome::NoData => std::thread::sleep(Duration::from_millis(1)),
        }
    }
}
