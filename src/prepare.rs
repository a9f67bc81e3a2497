//! Prepare stage: download and transform the desired assets that are not on
//! the device yet, so each one carries its real byte cost into planning.

use futures::{StreamExt, stream};
use serde::Serialize;

use crate::{
   catalog::Catalog,
   config::{Config, TransformFallback},
   sync::SyncProgressCallback,
   transform::{self, Transformer},
   types::{Candidate, DesiredAsset, MediaKind, SyncPhase, SyncProgress},
};

/// Counts of a prepare pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PrepareCounts {
   pub prepared:  usize,
   /// Downloads that failed.
   pub failed:    usize,
   /// Stills uploaded as original bytes after a failed resize.
   pub fallbacks: usize,
   /// Transform failures left out of the run.
   pub skipped:   usize,
}

#[derive(Debug, Clone, Default)]
pub struct PrepareOutcome {
   /// Costed assets, in candidate order.
   pub assets: Vec<DesiredAsset>,
   pub counts: PrepareCounts,
}

#[derive(Debug, Clone)]
pub struct PrepareSettings {
   pub fallback:      TransformFallback,
   pub remote_prefix: String,
   pub concurrency:   usize,
}

impl From<&Config> for PrepareSettings {
   fn from(config: &Config) -> Self {
      Self {
         fallback:      config.transform_fallback,
         remote_prefix: config.remote_prefix.clone(),
         concurrency:   config.effective_prepare_concurrency(),
      }
   }
}

impl Default for PrepareSettings {
   fn default() -> Self {
      Self::from(&Config::default())
   }
}

enum Prepared {
   Ready { asset: DesiredAsset, fallback: bool },
   DownloadFailed,
   Skipped,
}

pub struct Preparer<'a, C: ?Sized, T: ?Sized> {
   catalog:     &'a C,
   transformer: &'a T,
   settings:    &'a PrepareSettings,
}

impl<'a, C, T> Preparer<'a, C, T>
where
   C: Catalog + ?Sized,
   T: Transformer + ?Sized,
{
   pub const fn new(catalog: &'a C, transformer: &'a T, settings: &'a PrepareSettings) -> Self {
      Self { catalog, transformer, settings }
   }

   /// Name the asset is uploaded under.
   pub fn remote_name(&self, id: &str, extension: &str) -> String {
      format!("{}{id}.{extension}", self.settings.remote_prefix)
   }

   /// Prepares `candidates` with bounded concurrency. Output keeps input
   /// order regardless of which item finishes first.
   pub async fn prepare_all(
      &self,
      candidates: Vec<Candidate>,
      callback: &mut dyn SyncProgressCallback,
   ) -> PrepareOutcome {
      let total = candidates.len();
      let mut outcome = PrepareOutcome::default();
      let mut results = stream::iter(candidates)
         .map(|candidate| self.prepare_one(candidate))
         .buffered(self.settings.concurrency.max(1));

      let mut processed = 0;
      while let Some(result) = results.next().await {
         processed += 1;
         let current = match result {
            Prepared::Ready { asset, fallback } => {
               outcome.counts.prepared += 1;
               if fallback {
                  outcome.counts.fallbacks += 1;
               }
               let name = asset.remote_name.clone();
               outcome.assets.push(asset);
               Some(name)
            },
            Prepared::DownloadFailed => {
               outcome.counts.failed += 1;
               None
            },
            Prepared::Skipped => {
               outcome.counts.skipped += 1;
               None
            },
         };
         callback.progress(SyncProgress { phase: SyncPhase::Prepare, processed, total, current });
      }

      outcome
   }

   async fn prepare_one(&self, candidate: Candidate) -> Prepared {
      let source = match self.catalog.fetch_bytes(&candidate.id).await {
         Ok(bytes) if !bytes.is_empty() => bytes,
         Ok(_) => {
            tracing::warn!("download of {} returned no data", candidate.id);
            return Prepared::DownloadFailed;
         },
         Err(e) => {
            tracing::warn!("failed to download {}: {e}", candidate.id);
            return Prepared::DownloadFailed;
         },
      };

      let (artifact, fallback) = match self.transformer.transform(source.clone(), candidate.kind).await {
         Ok(artifact) => (artifact, false),
         Err(e) => match (candidate.kind, self.settings.fallback) {
            (MediaKind::Image, TransformFallback::Original) => {
               tracing::warn!("failed to resize {}, uploading original: {e}", candidate.id);
               (transform::passthrough(source), true)
            },
            _ => {
               tracing::warn!("failed to transform {}, skipping: {e}", candidate.id);
               return Prepared::Skipped;
            },
         },
      };

      let remote_name = self.remote_name(&candidate.id, artifact.extension);
      tracing::debug!("prepared {remote_name} ({} bytes)", artifact.size_bytes());
      Prepared::Ready {
         asset: DesiredAsset::new(candidate, remote_name, artifact.mime, artifact.bytes),
         fallback,
      }
   }
}
