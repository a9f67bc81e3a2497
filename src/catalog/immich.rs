//! Immich metadata search and asset download.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use reqwest::{Client, header};
use serde::Deserialize;
use serde_json::json;

use crate::{
   Result,
   catalog::{Catalog, DateWindow},
   error::HttpError,
   types::{CatalogItem, MediaKind},
};

const PAGE_SIZE: u32 = 250;
const MAX_PAGES: u32 = 20;

/// Client for an Immich server
#[derive(Debug, Clone)]
pub struct ImmichClient {
   base_url: String,
   api_key:  String,
   http:     Client,
}

impl ImmichClient {
   pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
      let http = Client::builder().timeout(timeout).build()?;
      Ok(Self {
         base_url: base_url.trim_end_matches('/').to_string(),
         api_key: api_key.to_string(),
         http,
      })
   }

   async fn search_page(&self, window: &DateWindow, page: u32) -> Result<SearchResponse> {
      let payload = json!({
         "takenAfter": DateWindow::format_bound(window.start),
         "takenBefore": DateWindow::format_bound(window.end),
         "page": page,
         "size": PAGE_SIZE,
      });

      let response = self
         .http
         .post(format!("{}/api/search/metadata", self.base_url))
         .header("x-api-key", &self.api_key)
         .header(header::ACCEPT, "application/json")
         .json(&payload)
         .send()
         .await?;
      if !response.status().is_success() {
         return Err(HttpError::StatusCode(response.status().as_u16()).into());
      }
      Ok(response.json::<SearchResponse>().await?)
   }
}

#[async_trait::async_trait]
impl Catalog for ImmichClient {
   async fn search(&self, window: &DateWindow) -> Result<Vec<CatalogItem>> {
      collect_pages(window.year, move |page| self.search_page(window, page)).await
   }

   async fn fetch_bytes(&self, id: &str) -> Result<Bytes> {
      let response = self
         .http
         .get(format!("{}/api/assets/{id}/original", self.base_url))
         .header("x-api-key", &self.api_key)
         .send()
         .await?;
      if !response.status().is_success() {
         return Err(HttpError::StatusCode(response.status().as_u16()).into());
      }
      let bytes = response.bytes().await?;
      tracing::debug!("downloaded asset {id} ({} bytes)", bytes.len());
      Ok(bytes)
   }
}

/// Follows `nextPage` links from page 1. A failed first page is an error; a
/// later failure keeps the items already collected.
async fn collect_pages<F, Fut>(year: i32, mut fetch: F) -> Result<Vec<CatalogItem>>
where
   F: FnMut(u32) -> Fut,
   Fut: Future<Output = Result<SearchResponse>>,
{
   let mut items = Vec::new();
   let mut page = 1;

   loop {
      let response = match fetch(page).await {
         Ok(response) => response,
         Err(e) if page == 1 => return Err(e),
         Err(e) => {
            tracing::warn!(
               "catalog page {page} for {year} failed, keeping {} item(s) from earlier pages: {e}",
               items.len()
            );
            break;
         },
      };
      items.extend(
         response
            .assets
            .items
            .into_iter()
            .filter_map(|asset| asset.into_item(year)),
      );

      let next = response
         .assets
         .next_page
         .as_deref()
         .and_then(|p| p.parse::<u32>().ok());
      match next {
         Some(next) if next > page && next <= MAX_PAGES => page = next,
         Some(_) => {
            tracing::warn!("stopping catalog pagination for {year} at page {page}");
            break;
         },
         None => break,
      }
   }

   Ok(items)
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
   #[serde(default)]
   assets: AssetPage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetPage {
   #[serde(default)]
   items:     Vec<AssetDto>,
   #[serde(default)]
   next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetDto {
   id:              Option<String>,
   asset_id:        Option<String>,
   #[serde(rename = "type")]
   kind:            Option<String>,
   exif_info:       Option<ExifDto>,
   file_created_at: Option<String>,
   created_at:      Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExifDto {
   date_time_original: Option<String>,
}

impl AssetDto {
   fn into_item(self, searched_year: i32) -> Option<CatalogItem> {
      let Some(id) = self.id.or(self.asset_id).filter(|id| !id.trim().is_empty()) else {
         tracing::warn!("catalog returned an asset without an id");
         return None;
      };
      // Missing type is treated as a still, matching what the search returns
      // for plain photo libraries.
      let kind = match self.kind.as_deref() {
         None => MediaKind::Image,
         Some(t) => match MediaKind::from_catalog_type(t) {
            Some(kind) => kind,
            None => {
               tracing::debug!("ignoring {id}: unsupported asset type {t}");
               return None;
            },
         },
      };

      let taken_at = self
         .exif_info
         .and_then(|e| e.date_time_original)
         .into_iter()
         .chain(self.file_created_at)
         .chain(self.created_at)
         .find_map(|s| parse_timestamp(&s));

      Some(CatalogItem {
         id,
         kind,
         origin_year: taken_at.map_or(searched_year, |t| t.year()),
         taken_at,
      })
   }
}

/// Parses RFC 3339 timestamps, plus naive ones (treated as UTC).
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
   if let Ok(t) = DateTime::parse_from_rfc3339(value) {
      return Some(t.with_timezone(&Utc));
   }
   ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
      .iter()
      .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
      .map(|t| t.and_utc())
}
