//! Upload sequencer: executes a selection plan against the device.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
   device::Device,
   sync::{SyncProgressCallback, ledger::CapacityLedger},
   types::{DesiredAsset, SyncPhase, SyncProgress},
};

/// Tally of an upload pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
   pub uploaded_count: usize,
   /// Bytes as reported by the device, not as planned.
   pub uploaded_bytes: u64,
   pub failed_count:   usize,
   /// Items left untouched because the run was cancelled.
   pub not_attempted:  usize,
   pub cancelled:      bool,
}

pub struct Sequencer<'a, D: ?Sized> {
   device: &'a D,
}

impl<'a, D: Device + ?Sized> Sequencer<'a, D> {
   pub const fn new(device: &'a D) -> Self {
      Self { device }
   }

   /// Uploads `selected` in order. A failed upload is logged, counted and
   /// skipped; the ledger only moves on confirmed success. Cancellation is
   /// honoured between items, never mid-upload.
   pub async fn execute(
      &self,
      selected: &[DesiredAsset],
      ledger: &mut CapacityLedger,
      cancel: &CancellationToken,
      callback: &mut dyn SyncProgressCallback,
   ) -> UploadReport {
      let mut report = UploadReport::default();
      let total = selected.len();

      for (i, asset) in selected.iter().enumerate() {
         if cancel.is_cancelled() {
            report.cancelled = true;
            report.not_attempted = total - i;
            tracing::info!("upload cancelled with {} item(s) remaining", report.not_attempted);
            break;
         }

         callback.progress(SyncProgress {
            phase:     SyncPhase::Upload,
            processed: i,
            total,
            current:   Some(asset.remote_name.clone()),
         });

         match self
            .device
            .upload(&asset.remote_name, asset.payload.clone(), asset.mime)
            .await
         {
            Ok(size) => {
               ledger.record_upload(size);
               report.uploaded_count += 1;
               report.uploaded_bytes += size;
               tracing::debug!(
                  "uploaded {} ({size} bytes, {} remaining)",
                  asset.remote_name,
                  ledger.remaining_bytes()
               );
            },
            Err(e) => {
               tracing::warn!("failed to upload {}: {e}", asset.remote_name);
               report.failed_count += 1;
            },
         }
      }

      if !report.cancelled && total > 0 {
         callback.progress(SyncProgress {
            phase: SyncPhase::Upload,
            processed: total,
            total,
            current: None,
         });
      }
      report
   }
}
