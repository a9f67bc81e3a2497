#![allow(dead_code)]

use std::{
   collections::{HashMap, HashSet},
   sync::{
      Arc, Mutex,
      atomic::{AtomicBool, AtomicU32, Ordering},
   },
   time::Duration,
};

use bytes::Bytes;
use memoria::{
   catalog::{Catalog, DateWindow},
   device::Device,
   error::HttpError,
   sync::Delay,
   transform::{Artifact, Transformer},
   types::{
      Candidate, CatalogItem, DesiredAsset, DeviceFile, MatchToken, MediaKind, PriorityTier,
   },
};

/// In-memory device with failure injection.
#[derive(Default)]
pub struct FakeDevice {
   files:          Mutex<Vec<DeviceFile>>,
   probes:         AtomicU32,
   reachable_from: Option<u32>,
   /// Keep only the last `n` characters of uploaded names.
   max_name_len:   Option<usize>,
   hide_sizes:     bool,
   list_fails:     AtomicBool,
   /// Listings after this many successful ones fail.
   lists_allowed:  Option<u32>,
   lists:          AtomicU32,
   /// Size the device claims for every upload.
   reported_size:  Option<u64>,
   fail_deletes:   HashSet<String>,
   /// Uploads whose name contains any of these fail.
   fail_uploads:   Vec<String>,
   deletes:        Mutex<Vec<String>>,
   uploads:        Mutex<Vec<String>>,
}

impl FakeDevice {
   pub fn new() -> Self {
      Self { reachable_from: Some(1), ..Self::default() }
   }

   pub fn with_file(self, name: &str, size: u64) -> Self {
      self.lock_files().push(DeviceFile::new(name, Some(size)));
      self
   }

   pub fn unreachable(mut self) -> Self {
      self.reachable_from = None;
      self
   }

   pub fn reachable_from(mut self, attempt: u32) -> Self {
      self.reachable_from = Some(attempt);
      self
   }

   pub fn truncate_names(mut self, keep: usize) -> Self {
      self.max_name_len = Some(keep);
      self
   }

   pub fn without_sizes(mut self) -> Self {
      self.hide_sizes = true;
      self
   }

   pub fn fail_delete(mut self, name: &str) -> Self {
      self.fail_deletes.insert(name.to_string());
      self
   }

   pub fn fail_upload(mut self, fragment: &str) -> Self {
      self.fail_uploads.push(fragment.to_string());
      self
   }

   pub fn fail_list_after(mut self, successes: u32) -> Self {
      self.lists_allowed = Some(successes);
      self
   }

   pub fn report_size(mut self, size: u64) -> Self {
      self.reported_size = Some(size);
      self
   }

   pub fn set_list_fails(&self, fails: bool) {
      self.list_fails.store(fails, Ordering::SeqCst);
   }

   pub fn probe_count(&self) -> u32 {
      self.probes.load(Ordering::SeqCst)
   }

   pub fn names(&self) -> Vec<String> {
      self.lock_files().iter().map(|f| f.name.clone()).collect()
   }

   pub fn used_bytes(&self) -> u64 {
      self.lock_files().iter().filter_map(|f| f.size_bytes).sum()
   }

   pub fn deleted(&self) -> Vec<String> {
      self.deletes.lock().expect("deletes lock").clone()
   }

   pub fn uploaded(&self) -> Vec<String> {
      self.uploads.lock().expect("uploads lock").clone()
   }

   fn lock_files(&self) -> std::sync::MutexGuard<'_, Vec<DeviceFile>> {
      self.files.lock().expect("files lock")
   }

   fn stored_name(&self, name: &str) -> String {
      match self.max_name_len {
         Some(keep) if name.chars().count() > keep => {
            let skip = name.chars().count() - keep;
            name.chars().skip(skip).collect()
         },
         _ => name.to_string(),
      }
   }
}

#[async_trait::async_trait]
impl Device for FakeDevice {
   async fn probe(&self) -> bool {
      let n = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
      self.reachable_from.is_some_and(|from| n >= from)
   }

   async fn list(&self) -> memoria::Result<Vec<DeviceFile>> {
      let n = self.lists.fetch_add(1, Ordering::SeqCst) + 1;
      if self.list_fails.load(Ordering::SeqCst) || self.lists_allowed.is_some_and(|max| n > max) {
         return Err(HttpError::StatusCode(500).into());
      }
      let files = self.lock_files().clone();
      if self.hide_sizes {
         return Ok(files.into_iter().map(|f| DeviceFile::new(f.name, None)).collect());
      }
      Ok(files)
   }

   async fn delete(&self, name: &str) -> memoria::Result<()> {
      if self.fail_deletes.contains(name) {
         return Err(HttpError::StatusCode(500).into());
      }
      let mut files = self.lock_files();
      let before = files.len();
      files.retain(|f| f.name != name);
      if files.len() == before {
         return Err(HttpError::StatusCode(404).into());
      }
      self.deletes.lock().expect("deletes lock").push(name.to_string());
      Ok(())
   }

   async fn upload(&self, name: &str, payload: Bytes, _mime: &str) -> memoria::Result<u64> {
      if self.fail_uploads.iter().any(|f| name.contains(f.as_str())) {
         return Err(HttpError::StatusCode(507).into());
      }
      let stored = self.stored_name(name);
      let size = self.reported_size.unwrap_or(payload.len() as u64);
      let mut files = self.lock_files();
      files.retain(|f| f.name != stored);
      files.push(DeviceFile::new(stored, Some(size)));
      self.uploads.lock().expect("uploads lock").push(name.to_string());
      Ok(size)
   }
}

/// Catalog answering from fixed per-year item lists.
#[derive(Default)]
pub struct FakeCatalog {
   by_year:      HashMap<i32, Vec<CatalogItem>>,
   payloads:     HashMap<String, Bytes>,
   failing_year: HashSet<i32>,
   searches:     AtomicU32,
}

impl FakeCatalog {
   pub fn new() -> Self {
      Self::default()
   }

   /// Adds an item whose original has `size` bytes.
   pub fn with_item(mut self, id: &str, year: i32, kind: MediaKind, size: usize) -> Self {
      self.by_year.entry(year).or_default().push(item(id, year, kind));
      self.payloads.insert(id.to_string(), Bytes::from(vec![b'x'; size]));
      self
   }

   /// Adds an item with no downloadable original.
   pub fn with_broken_item(mut self, id: &str, year: i32, kind: MediaKind) -> Self {
      self.by_year.entry(year).or_default().push(item(id, year, kind));
      self
   }

   pub fn failing_year(mut self, year: i32) -> Self {
      self.failing_year.insert(year);
      self
   }

   pub fn search_count(&self) -> u32 {
      self.searches.load(Ordering::SeqCst)
   }
}

#[async_trait::async_trait]
impl Catalog for FakeCatalog {
   async fn search(&self, window: &DateWindow) -> memoria::Result<Vec<CatalogItem>> {
      self.searches.fetch_add(1, Ordering::SeqCst);
      if self.failing_year.contains(&window.year) {
         return Err(HttpError::StatusCode(503).into());
      }
      Ok(self.by_year.get(&window.year).cloned().unwrap_or_default())
   }

   async fn fetch_bytes(&self, id: &str) -> memoria::Result<Bytes> {
      self
         .payloads
         .get(id)
         .cloned()
         .ok_or_else(|| HttpError::StatusCode(404).into())
   }
}

/// Returns the source unchanged, labelled by kind.
pub struct PassthroughTransformer;

#[async_trait::async_trait]
impl Transformer for PassthroughTransformer {
   async fn transform(&self, source: Bytes, kind: MediaKind) -> memoria::Result<Artifact> {
      Ok(match kind {
         MediaKind::Image => Artifact { bytes: source, mime: "image/jpeg", extension: "jpg" },
         MediaKind::Video => Artifact { bytes: source, mime: "image/gif", extension: "gif" },
      })
   }
}

/// Delay that returns immediately and remembers what it was asked to wait.
#[derive(Clone, Default)]
pub struct RecordingDelay {
   waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
   pub fn waits(&self) -> Vec<Duration> {
      self.waits.lock().expect("waits lock").clone()
   }
}

#[async_trait::async_trait]
impl Delay for RecordingDelay {
   async fn wait(&self, duration: Duration) {
      self.waits.lock().expect("waits lock").push(duration);
   }
}

pub fn item(id: &str, year: i32, kind: MediaKind) -> CatalogItem {
   CatalogItem { id: id.to_string(), kind, taken_at: None, origin_year: year }
}

pub fn candidate(id: &str, year: i32) -> Candidate {
   Candidate {
      id:          id.to_string(),
      match_token: MatchToken::derive(id, 12),
      group_key:   year,
      tier:        PriorityTier::High,
      kind:        MediaKind::Image,
   }
}

/// Costed asset as the planner sees it.
pub fn asset(id: &str, year: i32, tier: PriorityTier, cost: usize) -> DesiredAsset {
   let kind = match tier {
      PriorityTier::High => MediaKind::Image,
      PriorityTier::Low => MediaKind::Video,
   };
   let candidate = Candidate { tier, kind, ..candidate(id, year) };
   DesiredAsset::new(candidate, format!("resized_{id}.jpg"), "image/jpeg", Bytes::from(vec![0u8; cost]))
}
