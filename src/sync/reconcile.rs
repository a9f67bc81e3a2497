//! Remote state reconciliation: inventory, stale classification, deletion.
//!
//! Matching is substring containment of each desired asset's match token in
//! the device file name. A file is only deleted on an explicit non-match, so a
//! missing or partial inventory can cause extra uploads but never a wrong
//! deletion.
//!
//! Known limitation: if one desired token is a substring of another desired
//! asset's device file name, the two cannot be told apart. Catalog ids are
//! assumed distinct enough in their tails; [`token_collisions`] reports the
//! cases where they are not.

use serde::Serialize;

use crate::{
   device::Device,
   sync::SyncProgressCallback,
   types::{DeviceFile, Matchable, MatchToken, SyncPhase, SyncProgress},
};

/// Tally of a deletion pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
   pub deleted_count: usize,
   /// Bytes freed by confirmed deletions with a known size.
   pub deleted_bytes: u64,
   pub failed_count:  usize,
   /// Names the device confirmed as deleted, in deletion order.
   pub deleted:       Vec<String>,
}

/// State after reconciliation
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
   /// Inventory the capacity ledger is built from.
   pub inventory:     Vec<DeviceFile>,
   pub stale:         Vec<DeviceFile>,
   pub deletion:      DeletionReport,
   /// Whether the inventory was listed again after deletions.
   pub resnapshotted: bool,
}

pub struct Reconciler<'a, D: ?Sized> {
   device: &'a D,
}

impl<'a, D: Device + ?Sized> Reconciler<'a, D> {
   pub const fn new(device: &'a D) -> Self {
      Self { device }
   }

   /// Lists the device. A failed listing is logged and treated as empty.
   pub async fn snapshot(&self) -> Vec<DeviceFile> {
      match self.device.list().await {
         Ok(files) => {
            tracing::info!("device holds {} file(s)", files.len());
            files
         },
         Err(e) => {
            tracing::warn!("failed to list device files, assuming it is empty: {e}");
            Vec::new()
         },
      }
   }

   /// Deletes each stale file independently, one at a time.
   pub async fn delete_all(
      &self,
      stale: &[DeviceFile],
      callback: &mut dyn SyncProgressCallback,
   ) -> DeletionReport {
      let mut report = DeletionReport::default();
      let total = stale.len();

      for (i, file) in stale.iter().enumerate() {
         callback.progress(SyncProgress {
            phase:     SyncPhase::Delete,
            processed: i,
            total,
            current:   Some(file.name.clone()),
         });
         match self.device.delete(&file.name).await {
            Ok(()) => {
               tracing::info!("deleted {} from device", file.name);
               report.deleted_count += 1;
               report.deleted_bytes += file.size_bytes.unwrap_or(0);
               report.deleted.push(file.name.clone());
            },
            Err(e) => {
               tracing::warn!("failed to delete {}: {e}", file.name);
               report.failed_count += 1;
            },
         }
      }

      if total > 0 {
         callback.progress(SyncProgress {
            phase: SyncPhase::Delete,
            processed: total,
            total,
            current: None,
         });
      }
      report
   }

   /// Snapshot, classify and delete stale files, then re-list the device if
   /// anything was deleted so capacity reflects the post-deletion state.
   ///
   /// If that second listing fails, the first snapshot minus the confirmed
   /// deletions stands in for it.
   ///
   /// With `dry_run` nothing is deleted and the returned inventory is the
   /// snapshot minus the stale files, i.e. what the device would hold.
   pub async fn reconcile<M: Matchable>(
      &self,
      desired: &[M],
      dry_run: bool,
      callback: &mut dyn SyncProgressCallback,
   ) -> ReconcileOutcome {
      let inventory = self.snapshot().await;
      let stale = classify_stale(desired, &inventory);

      if dry_run {
         let inventory = inventory
            .into_iter()
            .filter(|f| !stale.contains(f))
            .collect();
         return ReconcileOutcome { inventory, stale, ..ReconcileOutcome::default() };
      }

      let deletion = self.delete_all(&stale, callback).await;
      if deletion.deleted_count == 0 {
         return ReconcileOutcome { inventory, stale, deletion, resnapshotted: false };
      }

      match self.device.list().await {
         Ok(files) => {
            tracing::info!("device holds {} file(s) after deletions", files.len());
            ReconcileOutcome { inventory: files, stale, deletion, resnapshotted: true }
         },
         Err(e) => {
            tracing::warn!("failed to list device files after deletions, using the first listing: {e}");
            let inventory = inventory
               .into_iter()
               .filter(|f| !deletion.deleted.contains(&f.name))
               .collect();
            ReconcileOutcome { inventory, stale, deletion, resnapshotted: false }
         },
      }
   }
}

/// True when some desired asset's token occurs in `file_name`.
pub fn is_wanted<M: Matchable>(desired: &[M], file_name: &str) -> bool {
   desired.iter().any(|d| d.match_token().matches(file_name))
}

/// Device files no desired asset matches, in inventory order.
pub fn classify_stale<M: Matchable>(desired: &[M], inventory: &[DeviceFile]) -> Vec<DeviceFile> {
   inventory
      .iter()
      .filter(|f| !is_wanted(desired, &f.name))
      .cloned()
      .collect()
}

/// Splits `desired` into assets already on the device and assets still
/// missing, preserving order within each side.
pub fn partition_present<M: Matchable>(desired: Vec<M>, inventory: &[DeviceFile]) -> (Vec<M>, Vec<M>) {
   desired
      .into_iter()
      .partition(|d| inventory.iter().any(|f| d.match_token().matches(&f.name)))
}

/// Pairs of tokens where one contains the other; such assets cannot be told
/// apart on the device.
pub fn token_collisions<M: Matchable>(desired: &[M]) -> Vec<(MatchToken, MatchToken)> {
   let mut collisions = Vec::new();
   for (i, a) in desired.iter().enumerate() {
      for b in &desired[i + 1..] {
         let (ta, tb) = (a.match_token(), b.match_token());
         if ta.as_str().contains(tb.as_str()) || tb.as_str().contains(ta.as_str()) {
            collisions.push((ta.clone(), tb.clone()));
         }
      }
   }
   collisions
}
