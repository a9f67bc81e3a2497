//! Memory catalog abstraction with an Immich implementation.

mod immich;

use std::{collections::HashSet, sync::Arc};

use bytes::Bytes;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

pub use immich::ImmichClient;
use crate::{Result, types::CatalogItem};

/// One calendar day in one past year, as an inclusive UTC range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
   pub year:  i32,
   pub start: DateTime<Utc>,
   pub end:   DateTime<Utc>,
}

impl DateWindow {
   /// Window covering the whole of `day` in UTC.
   pub fn for_day(day: NaiveDate) -> Self {
      let start = day.and_time(NaiveTime::default());
      let end = day
         .and_hms_milli_opt(23, 59, 59, 999)
         .unwrap_or(start);
      Self { year: day.year(), start: Utc.from_utc_datetime(&start), end: Utc.from_utc_datetime(&end) }
   }

   /// The same month/day as `today` in each of the `years_back` previous
   /// years, most recent first. Years where the day does not exist (Feb 29)
   /// are left out.
   pub fn for_years_back(today: NaiveDate, years_back: u32) -> Vec<Self> {
      (1..=years_back as i32)
         .filter_map(|back| {
            let year = today.year() - back;
            let day = NaiveDate::from_ymd_opt(year, today.month(), today.day());
            if day.is_none() {
               tracing::debug!("{year} has no {:02}-{:02}; skipping", today.month(), today.day());
            }
            day.map(Self::for_day)
         })
         .collect()
   }

   /// Timestamp format the catalog expects (`2019-06-01T00:00:00.000Z`).
   pub fn format_bound(bound: DateTime<Utc>) -> String {
      bound.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
   }
}

/// Source of desired memories.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
   /// Items taken inside the window.
   async fn search(&self, window: &DateWindow) -> Result<Vec<CatalogItem>>;

   /// Original bytes of one item.
   async fn fetch_bytes(&self, id: &str) -> Result<Bytes>;
}

#[async_trait::async_trait]
impl<T: Catalog + ?Sized> Catalog for Arc<T> {
   async fn search(&self, window: &DateWindow) -> Result<Vec<CatalogItem>> {
      (**self).search(window).await
   }

   async fn fetch_bytes(&self, id: &str) -> Result<Bytes> {
      (**self).fetch_bytes(id).await
   }
}

/// Result of querying every window
#[derive(Debug, Clone, Default)]
pub struct CatalogHarvest {
   pub items:          Vec<CatalogItem>,
   pub failed_windows: usize,
}

/// Searches each window in order. A failed window is logged and counted;
/// duplicate ids are kept once, at their first position.
pub async fn harvest<C: Catalog + ?Sized>(catalog: &C, windows: &[DateWindow]) -> CatalogHarvest {
   let mut harvest = CatalogHarvest::default();
   let mut seen = HashSet::new();

   for window in windows {
      match catalog.search(window).await {
         Ok(items) => {
            if !items.is_empty() {
               tracing::info!("found {} memories from {}", items.len(), window.year);
            }
            for item in items {
               if seen.insert(item.id.clone()) {
                  harvest.items.push(item);
               }
            }
         },
         Err(e) => {
            tracing::warn!("catalog search for {} failed: {e}", window.year);
            harvest.failed_windows += 1;
         },
      }
   }

   harvest
}
