//! Sync command.
//!
//! Runs one reconciliation of the device against today's memories.

use std::path::Path;

use chrono::{Datelike, Local, NaiveDate};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
   Error, Result,
   cmd,
   config::Config,
   report,
   sync::{RunOptions, SyncEngine, SyncSettings},
};

/// Date override read when neither `--date` nor `MEMORIA_DATE` is set.
const LEGACY_DATE_ENV: &str = "TEST_DATE";

#[derive(Serialize)]
struct UnreachableJson<'a> {
   error:    &'static str,
   url:      &'a str,
   attempts: u32,
}

pub async fn execute(
   config_path: Option<&Path>,
   date: Option<String>,
   dry_run: bool,
   json: bool,
   cancel: CancellationToken,
) -> Result<()> {
   let cfg = Config::load(config_path)?;
   cfg.validate()?;

   let legacy = std::env::var(LEGACY_DATE_ENV).ok();
   let date = resolve_date(date.as_deref(), legacy.as_deref(), Local::now().date_naive());

   let engine = SyncEngine::new(
      cmd::catalog_client(&cfg)?,
      cmd::device_client(&cfg)?,
      cmd::transformer(&cfg),
      SyncSettings::from(&cfg),
   );

   let mut pb = if json { ProgressBar::hidden() } else { ProgressBar::new(0) };
   pb.set_style(
      ProgressStyle::default_bar()
         .template("{spinner:.green} {prefix} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
         .unwrap_or_else(|_| ProgressStyle::default_bar())
         .progress_chars("█▓░"),
   );

   let result = engine
      .run(date, RunOptions { dry_run }, &cancel, &mut pb)
      .await;
   pb.finish_and_clear();

   let summary = match result {
      Ok(summary) => summary,
      Err(Error::DeviceUnreachable { url, attempts }) => {
         if json {
            let payload = UnreachableJson { error: "device_unreachable", url: &url, attempts };
            println!("{}", report::to_json(&payload)?);
         } else {
            eprint!("{}", report::render_unreachable(&url, attempts, cfg.gate_delay_secs));
         }
         return Err(Error::Reported {
            message:   format!("device at {url} unreachable after {attempts} attempt(s)"),
            exit_code: 3,
         });
      },
      Err(e) => return Err(e),
   };

   if json {
      println!("{}", report::to_json(&summary)?);
   } else {
      print!("{}", report::render_summary(&summary));
      if summary.dry_run {
         println!("{}", style("Dry run: nothing was deleted or uploaded").dim());
      }
   }

   if summary.upload.cancelled {
      return Err(Error::Cancelled);
   }
   Ok(())
}

/// Picks the run date: the explicit override, then the legacy one, then
/// `today`. An unparsable override is logged and falls back to `today`.
pub fn resolve_date(explicit: Option<&str>, legacy: Option<&str>, today: NaiveDate) -> NaiveDate {
   let Some(raw) = explicit.or(legacy) else {
      return today;
   };
   parse_date_override(raw, today).unwrap_or_else(|| {
      tracing::warn!("ignoring invalid date override {raw:?}; expected MM-DD or YYYY-MM-DD");
      today
   })
}

/// Parses `MM-DD` (in the year of `today`) or `YYYY-MM-DD`.
pub fn parse_date_override(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
   let raw = raw.trim();
   if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
      return Some(date);
   }
   let (month, day) = raw.split_once('-')?;
   NaiveDate::from_ymd_opt(today.year(), month.parse().ok()?, day.parse().ok()?)
}
