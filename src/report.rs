//! Console rendering of run results.
//!
//! Core components return structured values; everything user-facing is built
//! here with `console::style`. Renderers return strings so commands decide
//! where they go.

use std::fmt::Write as _;

use console::style;
use serde::Serialize;

use crate::{
   Result,
   sync::{CapacityLedger, RunSummary},
   types::DeviceFile,
   util::{format_size, format_usage},
};

/// Pretty JSON for `--json` output.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
   Ok(serde_json::to_string_pretty(value)?)
}

pub fn render_ledger(ledger: &CapacityLedger) -> String {
   let mut line = format!(
      "{} used, {} free",
      format_usage(ledger.used_bytes(), ledger.total_bytes()),
      format_size(ledger.remaining_bytes())
   );
   if ledger.unknown_sizes() > 0 {
      let _ = write!(line, " ({} file(s) without size)", ledger.unknown_sizes());
   }
   if ledger.is_overcommitted() {
      let _ = write!(line, " {}", style("over capacity").red());
   }
   line
}

pub fn render_summary(summary: &RunSummary) -> String {
   let mut out = String::new();
   let title = if summary.dry_run {
      format!("Dry run for {}", summary.date.format("%m-%d"))
   } else {
      format!("Memories for {}", summary.date.format("%m-%d"))
   };
   let _ = writeln!(out, "{}", style(title).bold());

   if summary.gate.attempts > 1 {
      let _ = writeln!(out, "  device answered after {} attempts", summary.gate.attempts);
   }

   if summary.catalog_total == 0 {
      let _ = writeln!(out, "  {}", style("No memories found for this day").dim());
      if summary.failed_windows > 0 {
         let _ = writeln!(out, "  {} {} catalog search(es) failed", style("!").yellow(), summary.failed_windows);
      }
      let _ = writeln!(out, "  capacity: {}", render_ledger(&summary.ledger_after));
      return out;
   }

   let years: Vec<String> = summary.years.iter().map(i32::to_string).collect();
   let _ = writeln!(
      out,
      "  {} memories from {}",
      summary.catalog_total,
      if years.is_empty() { "-".to_string() } else { years.join(", ") }
   );
   if summary.failed_windows > 0 {
      let _ = writeln!(out, "  {} {} catalog search(es) failed", style("!").yellow(), summary.failed_windows);
   }
   let _ = writeln!(out, "  {} already on the device", summary.already_present);

   let verb = if summary.dry_run { "would delete" } else { "deleted" };
   if summary.dry_run {
      let _ = writeln!(out, "  {verb} {} stale file(s)", summary.stale.len());
   } else {
      let _ = writeln!(
         out,
         "  {verb} {} stale file(s), freed {}",
         summary.deletion.deleted_count,
         format_size(summary.deletion.deleted_bytes)
      );
      if summary.deletion.failed_count > 0 {
         let _ = writeln!(out, "  {} {} deletion(s) failed", style("✗").red(), summary.deletion.failed_count);
      }
   }
   for name in &summary.stale {
      let _ = writeln!(out, "    {} {}", style("-").red(), style(name).dim());
   }

   let prep = &summary.prepare;
   let _ = writeln!(out, "  prepared {} new item(s)", prep.prepared);
   if prep.fallbacks > 0 {
      let _ = writeln!(out, "  {} {} sent as original after resize failed", style("○").yellow(), prep.fallbacks);
   }
   if prep.failed + prep.skipped > 0 {
      let _ = writeln!(
         out,
         "  {} {} download(s) failed, {} transform(s) skipped",
         style("✗").red(),
         prep.failed,
         prep.skipped
      );
   }

   let plan = &summary.plan;
   let _ = writeln!(
      out,
      "  plan: {} selected ({}), {} deferred ({}), budget {}",
      plan.selected.len(),
      format_size(plan.selected_bytes),
      plan.deferred.len(),
      format_size(plan.deferred_bytes),
      format_size(plan.budget_bytes)
   );

   if summary.dry_run {
      for name in &plan.selected {
         let _ = writeln!(out, "    {} {name}", style("+").green());
      }
   } else {
      let up = &summary.upload;
      let _ = writeln!(out, "  uploaded {} file(s), {}", up.uploaded_count, format_size(up.uploaded_bytes));
      if up.failed_count > 0 {
         let _ = writeln!(out, "  {} {} upload(s) failed", style("✗").red(), up.failed_count);
      }
      if up.cancelled {
         let _ = writeln!(out, "  {} cancelled, {} upload(s) not attempted", style("!").yellow(), up.not_attempted);
      }
   }
   for name in &plan.deferred {
      let _ = writeln!(out, "    {} {}", style("·").dim(), style(format!("{name} (no room)")).dim());
   }

   let _ = writeln!(out, "  capacity: {}", render_ledger(&summary.ledger_after));
   let status = if summary.is_complete() { style("✓ in sync").green() } else { style("○ partially synced").yellow() };
   let _ = writeln!(out, "  {status}");
   out
}

pub fn render_inventory(files: &[DeviceFile], ledger: &CapacityLedger) -> String {
   let mut out = String::new();
   let _ = writeln!(out, "{}", style("Device files").bold());
   if files.is_empty() {
      let _ = writeln!(out, "  {}", style("(empty)").dim());
   }
   for file in files {
      let size = file.size_bytes.map_or_else(|| "?".to_string(), format_size);
      let _ = writeln!(out, "  {:>9}  {}", size, file.name);
   }
   let _ = writeln!(out, "  capacity: {}", render_ledger(ledger));
   out
}

/// Remediation hints for a device that never answered.
pub fn render_unreachable(url: &str, attempts: u32, delay_secs: u64) -> String {
   let mut out = String::new();
   let _ = writeln!(out, "{} device at {} did not respond after {attempts} attempt(s)", style("✗").red(), style(url).bold());
   let _ = writeln!(out, "  check that:");
   let _ = writeln!(out, "  - the frame is powered on and showing its photo album");
   let _ = writeln!(out, "  - it is on the same Wi-Fi network as this machine");
   let _ = writeln!(out, "  - the address is right (set device_url or MEMORIA_DEVICE_URL)");
   let _ = writeln!(
      out,
      "  - retries suffice; currently {attempts} attempt(s) {delay_secs}s apart \
       (gate_max_attempts, gate_delay_secs)"
   );
   out
}

#[cfg(test)]
mod tests {
   use chrono::NaiveDate;

   use super::*;
   use crate::sync::{GateOutcome, PlanSummary, UploadReport};

   fn summary() -> RunSummary {
      RunSummary {
         date:            NaiveDate::from_ymd_opt(2024, 6, 1).expect("date"),
         dry_run:         false,
         gate:            GateOutcome { reachable: true, attempts: 1, delays: 0, cancelled: false },
         years:           vec![2019, 2021],
         catalog_total:   3,
         failed_windows:  0,
         already_present: 1,
         stale:           vec!["resized_old.jpg".to_string()],
         deletion:        Default::default(),
         prepare:         Default::default(),
         plan:            PlanSummary {
            selected: vec!["resized_a.jpg".to_string()],
            selected_bytes: 2048,
            deferred: vec!["resized_b.gif".to_string()],
            deferred_bytes: 900_000,
            budget_bytes: 4096,
            fast_path: false,
         },
         upload:          UploadReport { uploaded_count: 1, uploaded_bytes: 2048, ..Default::default() },
         ledger_before:   CapacityLedger::new(8192, 4096),
         ledger_after:    CapacityLedger::new(8192, 6144),
      }
   }

   #[test]
   fn summary_lists_years_and_deferred_items() {
      let text = console::strip_ansi_codes(&render_summary(&summary())).to_string();
      assert!(text.contains("3 memories from 2019, 2021"), "{text}");
      assert!(text.contains("resized_b.gif (no room)"), "{text}");
      assert!(text.contains("partially synced"), "{text}");
   }

   #[test]
   fn unreachable_hints_name_the_settings() {
      let text = console::strip_ansi_codes(&render_unreachable("http://frame", 3, 30)).to_string();
      assert!(text.contains("3 attempt(s) 30s apart"), "{text}");
      assert!(text.contains("MEMORIA_DEVICE_URL"), "{text}");
   }

   #[test]
   fn summary_json_is_structured() {
      let json = to_json(&summary()).expect("json");
      let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
      assert_eq!(value["date"], "2024-06-01");
      assert_eq!(value["upload"]["uploaded_bytes"], 2048);
      assert_eq!(value["plan"]["deferred"][0], "resized_b.gif");
   }
}
