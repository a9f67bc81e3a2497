//! HTTP client for GeekMagic-style photo frames.
//!
//! The firmware exposes a tiny file manager: `/filelist` (JSON on newer
//! firmware, an HTML listing on older), `/delete?file=` and a multipart
//! `/doUpload` endpoint. Files live under `/image/`; the firmware addresses
//! them with a doubled slash (`/image//name`).

use std::{sync::LazyLock, time::Duration};

use bytes::Bytes;
use regex::Regex;
use reqwest::{Client, multipart};
use serde_json::Value;

use crate::{
   Result,
   device::Device,
   error::HttpError,
   types::DeviceFile,
};

const IMAGE_DIR: &str = "/image/";

static HTML_ENTRY: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"href='/image//([^']+)'").expect("static regex"));

/// Client for a single device
#[derive(Debug, Clone)]
pub struct GeekMagicClient {
   base_url:      String,
   http:          Client,
   probe_timeout: Duration,
}

impl GeekMagicClient {
   pub fn new(base_url: &str, probe_timeout: Duration, request_timeout: Duration) -> Result<Self> {
      let http = Client::builder().timeout(request_timeout).build()?;
      Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http, probe_timeout })
   }

   pub fn base_url(&self) -> &str {
      &self.base_url
   }

   fn filelist_url(&self) -> String {
      format!("{}/filelist", self.base_url)
   }
}

#[async_trait::async_trait]
impl Device for GeekMagicClient {
   async fn probe(&self) -> bool {
      let response = self
         .http
         .get(self.filelist_url())
         .query(&[("dir", IMAGE_DIR)])
         .timeout(self.probe_timeout)
         .send()
         .await;
      match response {
         Ok(r) if r.status().is_success() => true,
         Ok(r) => {
            tracing::debug!("probe answered with HTTP {}", r.status().as_u16());
            false
         },
         Err(e) => {
            tracing::debug!("probe failed: {e}");
            false
         },
      }
   }

   async fn list(&self) -> Result<Vec<DeviceFile>> {
      let response = self
         .http
         .get(self.filelist_url())
         .query(&[("dir", IMAGE_DIR)])
         .send()
         .await?;
      if !response.status().is_success() {
         return Err(HttpError::StatusCode(response.status().as_u16()).into());
      }
      let body = response.text().await?;
      Ok(parse_listing(&body))
   }

   async fn delete(&self, name: &str) -> Result<()> {
      let remote_path = format!("{IMAGE_DIR}/{name}");
      let response = self
         .http
         .get(format!("{}/delete", self.base_url))
         .query(&[("file", remote_path.as_str())])
         .send()
         .await?;
      if !response.status().is_success() {
         return Err(HttpError::StatusCode(response.status().as_u16()).into());
      }
      Ok(())
   }

   async fn upload(&self, name: &str, payload: Bytes, mime: &str) -> Result<u64> {
      let size = payload.len() as u64;
      let part = multipart::Part::stream_with_length(payload, size)
         .file_name(name.to_string())
         .mime_str(mime)?;
      let form = multipart::Form::new().part("file", part);

      let response = self
         .http
         .post(format!("{}/doUpload", self.base_url))
         .query(&[("dir", IMAGE_DIR)])
         .multipart(form)
         .send()
         .await?;
      if !response.status().is_success() {
         return Err(HttpError::StatusCode(response.status().as_u16()).into());
      }
      Ok(size)
   }
}

/// Parses a `/filelist` response.
///
/// Accepts a JSON array, an object with a `files` array (entries are plain
/// names or objects with `name` and an optional `size`), or the HTML listing
/// older firmware returns. Anything else yields an empty listing.
pub fn parse_listing(body: &str) -> Vec<DeviceFile> {
   match serde_json::from_str::<Value>(body) {
      Ok(Value::Array(entries)) => entries.iter().filter_map(json_entry).collect(),
      Ok(Value::Object(map)) => match map.get("files") {
         Some(Value::Array(entries)) => entries.iter().filter_map(json_entry).collect(),
         _ => Vec::new(),
      },
      Ok(_) => Vec::new(),
      Err(_) => HTML_ENTRY
         .captures_iter(body)
         .map(|c| DeviceFile::new(&c[1], None))
         .collect(),
   }
}

fn json_entry(entry: &Value) -> Option<DeviceFile> {
   match entry {
      Value::String(name) => Some(DeviceFile::new(name.as_str(), None)),
      Value::Object(obj) => {
         let name = obj.get("name")?.as_str()?;
         let size = obj.get("size").and_then(|s| match s {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
         });
         Some(DeviceFile::new(name, size))
      },
      _ => None,
   }
}
