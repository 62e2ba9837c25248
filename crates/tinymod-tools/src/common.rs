use std::time::Duration;

use clap::Args;
use tinymod_core::{Master, MasterConfig, StationId};
use tinymod_link::{LinkError, SerialConfig, SerialLink, SystemClock};

#[derive(Debug, Clone, Args)]
pub struct SerialConnectionArgs {
    #[arg(long, default_value = "/dev/ttyUSB0")]
    pub port: String,
    #[arg(long, default_value_t = 19200)]
    pub baud: u32,
    #[arg(long, default_value_t = 500)]
    pub timeout: u64,
}

pub fn build_master(
    args: &SerialConnectionArgs,
) -> Result<Master<SerialLink, SystemClock>, LinkError> {
    let link = SerialLink::open(&args.port, args.baud, SerialConfig::default())?;

    let config =
        MasterConfig::default().with_response_timeout(Duration::from_millis(args.timeout));

    Ok(Master::with_config(link, SystemClock::new(), config))
}

pub fn parse_station(input: &str) -> Result<StationId, String> {
    let address: u8 = input
        .parse()
        .map_err(|_| format!("invalid station address: {input}"))?;
    StationId::new(address)
        .ok_or_else(|| format!("station address out of range (0-{}): {address}", StationId::MAX))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::parse_station;

    #[test]
    fn parse_station_bounds() {
        assert_eq!(parse_station("1").unwrap().as_u8(), 1);
        assert_eq!(parse_station("0").unwrap().as_u8(), 0);
        assert!(parse_station("248").is_err());
        assert!(parse_station("station one").is_err());
    }
}
