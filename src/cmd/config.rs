//! Config command.
//!
//! Prints the effective configuration with secrets redacted.

use std::path::Path;

use console::style;

use crate::{Result, config};

pub fn execute(config_path: Option<&Path>) -> Result<()> {
   let cfg = config::Config::load(config_path)?;
   println!("{} {}", style("# global config:").dim(), style(config::config_file_path().display()).dim());
   if let Some(path) = config_path {
      println!("{} {}", style("# explicit config:").dim(), style(path.display()).dim());
   }
   print!("{}", toml::to_string_pretty(&cfg.redacted())?);

   if let Err(e) = cfg.validate() {
      println!();
      println!("{} {e}", style("!").yellow());
   }
   Ok(())
}
