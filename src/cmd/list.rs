//! List command.
//!
//! Prints the device inventory and the capacity it leaves.

use std::path::Path;

use serde::Serialize;

use crate::{
   Result,
   cmd,
   config::Config,
   device::Device,
   report,
   sync::CapacityLedger,
   types::DeviceFile,
};

#[derive(Serialize)]
struct ListJson<'a> {
   files:  &'a [DeviceFile],
   ledger: CapacityLedger,
}

pub async fn execute(config_path: Option<&Path>, json: bool) -> Result<()> {
   let cfg = Config::load(config_path)?;
   cfg.validate_device()?;

   let device = cmd::device_client(&cfg)?;
   let files = device.list().await?;
   let ledger = CapacityLedger::from_inventory(cfg.capacity_bytes, &files);

   if json {
      println!("{}", report::to_json(&ListJson { files: &files, ledger })?);
   } else {
      print!("{}", report::render_inventory(&files, &ledger));
   }
   Ok(())
}
