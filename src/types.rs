use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of media reported by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
   Image,
   Video,
}

impl MediaKind {
   /// Maps the catalog's asset type (`IMAGE`, `VIDEO`, ...) to a media kind.
   pub fn from_catalog_type(value: &str) -> Option<Self> {
      if value.eq_ignore_ascii_case("image") {
         Some(Self::Image)
      } else if value.eq_ignore_ascii_case("video") {
         Some(Self::Video)
      } else {
         None
      }
   }

   pub const fn as_lowercase_str(self) -> &'static str {
      match self {
         Self::Image => "image",
         Self::Video => "video",
      }
   }
}

/// Selection priority within a fairness round. `High` is allocated first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityTier {
   High,
   Low,
}

impl PriorityTier {
   pub const ALL: [Self; 2] = [Self::High, Self::Low];
}

/// Media kind → priority tier assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMap {
   pub image: PriorityTier,
   pub video: PriorityTier,
}

impl Default for TierMap {
   fn default() -> Self {
      Self { image: PriorityTier::High, video: PriorityTier::Low }
   }
}

impl TierMap {
   pub const fn tier_for(self, kind: MediaKind) -> PriorityTier {
      match kind {
         MediaKind::Image => self.image,
         MediaKind::Video => self.video,
      }
   }
}

/// Trailing fragment of a catalog id that is expected to survive the device's
/// file name truncation.
///
/// Correspondence between desired assets and device files is substring
/// containment of this token, never equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MatchToken(String);

impl MatchToken {
   /// Takes the last `len` characters of `id`. A length of zero, or one at
   /// least as long as the id, keeps the whole id.
   pub fn derive(id: &str, len: usize) -> Self {
      let id = id.trim();
      let count = id.chars().count();
      if len == 0 || len >= count {
         return Self(id.to_string());
      }
      Self(id.chars().skip(count - len).collect())
   }

   pub fn as_str(&self) -> &str {
      &self.0
   }

   /// True when `file_name` contains this token. An empty token matches
   /// nothing.
   pub fn matches(&self, file_name: &str) -> bool {
      !self.0.is_empty() && file_name.contains(self.0.as_str())
   }
}

impl fmt::Display for MatchToken {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(&self.0)
   }
}

/// Anything that can be matched against device file names.
pub trait Matchable {
   fn match_token(&self) -> &MatchToken;
}

/// One item returned by a catalog search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
   pub id:          String,
   pub kind:        MediaKind,
   pub taken_at:    Option<DateTime<Utc>>,
   /// Year the memory comes from; falls back to the searched year when the
   /// catalog has no usable timestamp.
   pub origin_year: i32,
}

/// Desired asset before download and transform: everything but its cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
   pub id:          String,
   pub match_token: MatchToken,
   pub group_key:   i32,
   pub tier:        PriorityTier,
   pub kind:        MediaKind,
}

impl Candidate {
   pub fn from_item(item: CatalogItem, tiers: TierMap, token_len: usize) -> Self {
      Self {
         match_token: MatchToken::derive(&item.id, token_len),
         group_key:   item.origin_year,
         tier:        tiers.tier_for(item.kind),
         kind:        item.kind,
         id:          item.id,
      }
   }
}

impl Matchable for Candidate {
   fn match_token(&self) -> &MatchToken {
      &self.match_token
   }
}

/// Desired asset with its transformed payload, ready for planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredAsset {
   pub id:          String,
   pub match_token: MatchToken,
   pub group_key:   i32,
   pub tier:        PriorityTier,
   pub kind:        MediaKind,
   /// File name used for the upload.
   pub remote_name: String,
   pub mime:        &'static str,
   pub payload:     Bytes,
   /// Size of the transformed artifact in bytes.
   pub cost_bytes:  u64,
}

impl DesiredAsset {
   pub fn new(candidate: Candidate, remote_name: String, mime: &'static str, payload: Bytes) -> Self {
      Self {
         cost_bytes: payload.len() as u64,
         id: candidate.id,
         match_token: candidate.match_token,
         group_key: candidate.group_key,
         tier: candidate.tier,
         kind: candidate.kind,
         remote_name,
         mime,
         payload,
      }
   }
}

impl Matchable for DesiredAsset {
   fn match_token(&self) -> &MatchToken {
      &self.match_token
   }
}

/// File currently stored on the device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFile {
   pub name:       String,
   /// `None` when the device listing omits sizes.
   pub size_bytes: Option<u64>,
}

impl DeviceFile {
   pub fn new(name: impl Into<String>, size_bytes: Option<u64>) -> Self {
      Self { name: name.into(), size_bytes }
   }
}

/// Stage of a reconciliation run, reported through progress callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
   Probe,
   Delete,
   Prepare,
   Upload,
}

impl SyncPhase {
   pub const fn label(self) -> &'static str {
      match self {
         Self::Probe => "Probing device",
         Self::Delete => "Removing stale files",
         Self::Prepare => "Preparing memories",
         Self::Upload => "Uploading",
      }
   }
}

/// Progress tracking for a reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncProgress {
   pub phase:     SyncPhase,
   pub processed: usize,
   pub total:     usize,
   pub current:   Option<String>,
}
