//! Capacity-aware reconciliation engine
//!
//! One run is strictly ordered: gate, catalog harvest, reconcile (snapshot,
//! delete stale, re-snapshot), prepare, plan, upload. Device mutations are
//! issued one at a time. Only an unreachable device or a cancelled gate ends a
//! run early; every other collaborator failure is counted and skipped.

pub mod gate;
pub mod ledger;
pub mod planner;
pub mod reconcile;
pub mod sequencer;

use std::time::Duration;

use chrono::NaiveDate;
use indicatif::ProgressBar;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub use self::{
   gate::{Delay, Gate, GateOutcome, TokioDelay},
   ledger::CapacityLedger,
   planner::{Allocatable, SelectionPlan, select},
   reconcile::{DeletionReport, ReconcileOutcome, Reconciler},
   sequencer::{Sequencer, UploadReport},
};
pub use crate::types::SyncProgress;
use crate::{
   Result,
   catalog::{self, Catalog, DateWindow},
   config::Config,
   device::Device,
   error::Error,
   prepare::{PrepareCounts, PrepareSettings, Preparer},
   transform::Transformer,
   types::{Candidate, MediaKind, SyncPhase, TierMap},
};

/// Trait for receiving sync progress updates
pub trait SyncProgressCallback: Send {
   fn progress(&mut self, progress: SyncProgress);
}

impl<F: FnMut(SyncProgress) + Send> SyncProgressCallback for F {
   fn progress(&mut self, progress: SyncProgress) {
      self(progress);
   }
}

impl SyncProgressCallback for () {
   fn progress(&mut self, _progress: SyncProgress) {}
}

impl SyncProgressCallback for ProgressBar {
   fn progress(&mut self, progress: SyncProgress) {
      self.update(|state| {
         state.set_len(progress.total as u64);
         state.set_pos(progress.processed as u64);
      });
      self.set_prefix(progress.phase.label());
      match &progress.current {
         Some(name) => self.set_message(name.clone()),
         None => self.set_message(""),
      }
   }
}

/// Settings the engine reads from [`Config`]
#[derive(Debug, Clone)]
pub struct SyncSettings {
   pub device_url:        String,
   pub capacity_bytes:    u64,
   pub gate_max_attempts: u32,
   pub gate_delay:        Duration,
   pub years_back:        u32,
   pub include_videos:    bool,
   pub tiers:             TierMap,
   pub match_token_len:   usize,
   pub prepare:           PrepareSettings,
}

impl From<&Config> for SyncSettings {
   fn from(config: &Config) -> Self {
      Self {
         device_url:        config.device_url.clone(),
         capacity_bytes:    config.capacity_bytes,
         gate_max_attempts: config.gate_max_attempts,
         gate_delay:        config.gate_delay(),
         years_back:        config.years_back,
         include_videos:    config.include_videos,
         tiers:             config.tier_map(),
         match_token_len:   config.match_token_len,
         prepare:           PrepareSettings::from(config),
      }
   }
}

impl Default for SyncSettings {
   fn default() -> Self {
      Self::from(&Config::default())
   }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
   /// Plan everything, mutate nothing.
   pub dry_run: bool,
}

/// Selection plan without payloads
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanSummary {
   pub fast_path:      bool,
   pub budget_bytes:   u64,
   pub selected:       Vec<String>,
   pub selected_bytes: u64,
   pub deferred:       Vec<String>,
   pub deferred_bytes: u64,
}

impl From<&SelectionPlan> for PlanSummary {
   fn from(plan: &SelectionPlan) -> Self {
      Self {
         fast_path:      plan.fast_path,
         budget_bytes:   plan.budget_bytes,
         selected:       plan.selected.iter().map(|a| a.remote_name.clone()).collect(),
         selected_bytes: plan.selected_bytes(),
         deferred:       plan.deferred.iter().map(|a| a.remote_name.clone()).collect(),
         deferred_bytes: plan.deferred_bytes(),
      }
   }
}

/// Result summary from a reconciliation run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
   pub date:            NaiveDate,
   pub dry_run:         bool,
   pub gate:            GateOutcome,
   /// Years that produced at least one memory, ascending.
   pub years:           Vec<i32>,
   pub catalog_total:   usize,
   pub failed_windows:  usize,
   pub already_present: usize,
   pub stale:           Vec<String>,
   pub deletion:        DeletionReport,
   pub prepare:         PrepareCounts,
   pub plan:            PlanSummary,
   pub upload:          UploadReport,
   pub ledger_before:   CapacityLedger,
   pub ledger_after:    CapacityLedger,
}

impl RunSummary {
   fn empty(date: NaiveDate, dry_run: bool, gate: GateOutcome, ledger: CapacityLedger) -> Self {
      Self {
         date,
         dry_run,
         gate,
         years: Vec::new(),
         catalog_total: 0,
         failed_windows: 0,
         already_present: 0,
         stale: Vec::new(),
         deletion: DeletionReport::default(),
         prepare: PrepareCounts::default(),
         plan: PlanSummary::default(),
         upload: UploadReport::default(),
         ledger_before: ledger,
         ledger_after: ledger,
      }
   }

   /// Whether the device now holds everything it should.
   pub const fn is_complete(&self) -> bool {
      self.deletion.failed_count == 0
         && self.upload.failed_count == 0
         && self.plan.deferred_bytes == 0
         && self.prepare.failed == 0
         && !self.upload.cancelled
   }
}

/// Engine wiring catalog, device and transformer into one run
pub struct SyncEngine<C, D, T, W = TokioDelay> {
   catalog:     C,
   device:      D,
   transformer: T,
   gate:        Gate<W>,
   settings:    SyncSettings,
}

impl<C, D, T> SyncEngine<C, D, T, TokioDelay> {
   pub fn new(catalog: C, device: D, transformer: T, settings: SyncSettings) -> Self {
      let gate = Gate::new(settings.gate_max_attempts, settings.gate_delay);
      Self { catalog, device, transformer, gate, settings }
   }
}

impl<C, D, T, W> SyncEngine<C, D, T, W>
where
   C: Catalog,
   D: Device,
   T: Transformer,
   W: Delay,
{
   /// Replaces the delay used between gate attempts.
   pub fn with_delay<V: Delay>(self, waiter: V) -> SyncEngine<C, D, T, V> {
      SyncEngine {
         catalog:     self.catalog,
         device:      self.device,
         transformer: self.transformer,
         gate:        self.gate.with_delay(waiter),
         settings:    self.settings,
      }
   }

   pub const fn device(&self) -> &D {
      &self.device
   }

   pub const fn settings(&self) -> &SyncSettings {
      &self.settings
   }

   /// Runs the availability gate and turns a failure into an error.
   pub async fn ensure_reachable(&self, cancel: &CancellationToken) -> Result<GateOutcome> {
      let outcome = self.gate.await_reachable(&self.device, cancel).await;
      if outcome.reachable {
         return Ok(outcome);
      }
      if outcome.cancelled {
         return Err(Error::Cancelled);
      }
      Err(Error::DeviceUnreachable { url: self.settings.device_url.clone(), attempts: outcome.attempts })
   }

   /// Catalog items for the day, filtered and mapped to candidates.
   async fn candidates(&self, date: NaiveDate) -> (Vec<Candidate>, usize, usize) {
      let windows = DateWindow::for_years_back(date, self.settings.years_back);
      let harvest = catalog::harvest(&self.catalog, &windows).await;
      let catalog_total = harvest.items.len();

      let candidates = harvest
         .items
         .into_iter()
         .filter(|item| self.settings.include_videos || item.kind != MediaKind::Video)
         .map(|item| Candidate::from_item(item, self.settings.tiers, self.settings.match_token_len))
         .collect();
      (candidates, catalog_total, harvest.failed_windows)
   }

   /// Performs one full reconciliation for `date`.
   pub async fn run(
      &self,
      date: NaiveDate,
      options: RunOptions,
      cancel: &CancellationToken,
      callback: &mut dyn SyncProgressCallback,
   ) -> Result<RunSummary> {
      let dry_run = options.dry_run;
      callback.progress(SyncProgress { phase: SyncPhase::Probe, processed: 0, total: 1, current: None });
      let gate = self.ensure_reachable(cancel).await?;

      let (candidates, catalog_total, failed_windows) = self.candidates(date).await;
      let reconciler = Reconciler::new(&self.device);

      if candidates.is_empty() {
         tracing::warn!("no memories found for {date}; leaving the device untouched");
         let inventory = reconciler.snapshot().await;
         let ledger = CapacityLedger::from_inventory(self.settings.capacity_bytes, &inventory);
         let mut summary = RunSummary::empty(date, dry_run, gate, ledger);
         summary.catalog_total = catalog_total;
         summary.failed_windows = failed_windows;
         return Ok(summary);
      }

      let mut years: Vec<i32> = candidates.iter().map(|c| c.group_key).collect();
      years.sort_unstable();
      years.dedup();

      for (a, b) in reconcile::token_collisions(&candidates) {
         tracing::warn!("match tokens {a} and {b} overlap; these assets cannot be told apart on the device");
      }

      let reconciled = reconciler.reconcile(&candidates, dry_run, callback).await;
      let (present, missing) = reconcile::partition_present(candidates, &reconciled.inventory);
      if !present.is_empty() {
         tracing::info!("{} memories already on the device", present.len());
      }

      let ledger_before = CapacityLedger::from_inventory(self.settings.capacity_bytes, &reconciled.inventory);
      let mut ledger = ledger_before;

      let prepared = Preparer::new(&self.catalog, &self.transformer, &self.settings.prepare)
         .prepare_all(missing, callback)
         .await;

      let plan = select(prepared.assets, ledger.remaining_bytes());
      if !plan.deferred.is_empty() {
         tracing::info!(
            "{} item(s) deferred, {} bytes over the remaining budget",
            plan.deferred.len(),
            plan.deferred_bytes()
         );
      }

      let upload = if dry_run {
         ledger.record_upload(plan.selected_bytes());
         UploadReport::default()
      } else {
         Sequencer::new(&self.device)
            .execute(&plan.selected, &mut ledger, cancel, callback)
            .await
      };

      Ok(RunSummary {
         date,
         dry_run,
         gate,
         years,
         catalog_total,
         failed_windows,
         already_present: present.len(),
         stale: reconciled.stale.into_iter().map(|f| f.name).collect(),
         deletion: reconciled.deletion,
         prepare: prepared.counts,
         plan: PlanSummary::from(&plan),
         upload,
         ledger_before,
         ledger_after: ledger,
      })
   }
}
