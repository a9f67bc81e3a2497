//! Probe command.
//!
//! Runs the availability gate alone, with the configured retries.

use std::path::Path;

use console::style;
use tokio_util::sync::CancellationToken;

use crate::{
   Error, Result,
   cmd,
   config::Config,
   report,
   sync::Gate,
};

pub async fn execute(config_path: Option<&Path>, cancel: CancellationToken) -> Result<()> {
   let cfg = Config::load(config_path)?;
   cfg.validate_device()?;

   let device = cmd::device_client(&cfg)?;
   let gate = Gate::new(cfg.gate_max_attempts, cfg.gate_delay());
   println!("Probing {} ...", style(device.base_url()).bold());

   let outcome = gate.await_reachable(&device, &cancel).await;
   if outcome.reachable {
      println!("{} device reachable (attempt {}/{})", style("✓").green(), outcome.attempts, gate.max_attempts());
      return Ok(());
   }
   if outcome.cancelled {
      return Err(Error::Cancelled);
   }

   eprint!("{}", report::render_unreachable(device.base_url(), outcome.attempts, cfg.gate_delay_secs));
   Err(Error::Reported {
      message:   format!("device unreachable after {} attempt(s)", outcome.attempts),
      exit_code: 3,
   })
}
