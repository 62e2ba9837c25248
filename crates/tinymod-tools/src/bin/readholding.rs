use clap::Parser;
use tinymod_core::StationId;
use tinymod_tools::common::{build_master, init_tracing, parse_station, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(name = "readholding", about = "Read holding registers (FC03)")]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    #[arg(long, default_value = "1", value_parser = parse_station)]
    station: StationId,
    #[arg(long)]
    start: u16,
    #[arg(long, default_value_t = 1)]
    quantity: u16,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let mut master = build_master(&args.conn)?;

    let mut values = vec![0u16; usize::from(args.quantity)];
    master.read_holding_registers(args.station, args.start, &mut values)?;

    for (idx, value) in values.iter().enumerate() {
        println!(
            "addr={} value={} (0x{:04X})",
            args.start + idx as u16,
            value,
            value
        );
    }
    Ok(())
}
