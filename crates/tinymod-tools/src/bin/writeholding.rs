use clap::Parser;
use tinymod_core::StationId;
use tinymod_tools::common::{build_master, init_tracing, parse_station, SerialConnectionArgs};

#[derive(Debug, Parser)]
#[command(
    name = "writeholding",
    about = "Write one or more holding registers (FC16); station 0 broadcasts"
)]
struct Args {
    #[command(flatten)]
    conn: SerialConnectionArgs,
    #[arg(long, default_value = "1", value_parser = parse_station)]
    station: StationId,
    #[arg(long)]
    start: u16,
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    values: Vec<u16>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();
    let mut master = build_master(&args.conn)?;

    master.write_multiple_registers(args.station, args.start, &args.values)?;

    println!(
        "wrote {} register(s) starting at {}",
        args.values.len(),
        args.start
    );
    Ok(())
}
