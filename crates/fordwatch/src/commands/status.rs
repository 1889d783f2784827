//! The `status` command: one-shot fetch and print, no persistence.

use crate::cli::GlobalOpts;
use crate::error::CliError;

use super::util;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = fordwatch_config::load_config()?;
    let unit = fordwatch_config::parse_unit(&cfg.unit)?;
    let client = util::build_client(&cfg, global)?;

    let status = client
        .fetch()
        .await
        .map_err(fordwatch_core::CoreError::from)?;

    println!("Vehicle: {}", client.vin());

    match status.charge_percent {
        Some(charge) => println!("Charge:  {charge:.0}%"),
        None => println!("Charge:  not reported"),
    }

    match status.range_km {
        Some(km) => println!("Range:   {:.0} {}", unit.from_km(km), unit.label()),
        None => println!("Range:   not reported"),
    }

    if let Some(plug) = status.plug_status {
        println!("Plug:    {plug}");
    }
    if let Some(charging) = status.charging_status {
        println!("Charging: {charging}");
    }
    if let Some(ts) = status.raw_timestamp {
        println!("Reported: {ts}");
    }

    Ok(())
}
