//! Configuration for the catalog, the device, capacity and transform settings.
//!
//! Values are layered: built-in defaults, `~/.memoria/config.toml`, an optional
//! explicit file, the legacy `IMMICH_*`/`GEEKMAGIC_URL` variables, and finally
//! `MEMORIA_*` environment variables.

use std::{
   fs,
   path::{Path, PathBuf},
   sync::OnceLock,
   time::Duration,
};

use directories::BaseDirs;
use figment::{
   Figment,
   providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{
   error::{ConfigError, Result},
   types::{PriorityTier, TierMap},
};

pub const ENV_PREFIX: &str = "MEMORIA_";

/// What to upload when a still image cannot be resized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformFallback {
   /// Upload the downloaded bytes unchanged.
   Original,
   /// Leave the asset out of this run.
   Skip,
}

/// Application configuration loaded from config files and environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
   pub immich_url:     String,
   pub immich_api_key: String,
   pub device_url:     String,

   pub capacity_bytes:       u64,
   pub gate_max_attempts:    u32,
   pub gate_delay_secs:      u64,
   pub probe_timeout_ms:     u64,
   pub request_timeout_secs: u64,

   pub match_token_len: usize,
   pub years_back:      u32,
   pub include_videos:  bool,
   pub image_tier:      PriorityTier,
   pub video_tier:      PriorityTier,

   pub target_width:        u32,
   pub target_height:       u32,
   pub jpeg_quality:        u8,
   pub animation_max_secs:  u32,
   pub animation_fps:       u32,
   pub ffmpeg_path:         String,
   pub transform_fallback:  TransformFallback,
   pub prepare_concurrency: usize,
   pub remote_prefix:       String,
}

impl Default for Config {
   fn default() -> Self {
      Self {
         immich_url:           String::new(),
         immich_api_key:       String::new(),
         device_url:           String::new(),
         capacity_bytes:       3 * 1024 * 1024,
         gate_max_attempts:    3,
         gate_delay_secs:      30,
         probe_timeout_ms:     3000,
         request_timeout_secs: 60,
         match_token_len:      12,
         years_back:           10,
         include_videos:       true,
         image_tier:           PriorityTier::High,
         video_tier:           PriorityTier::Low,
         target_width:         240,
         target_height:        240,
         jpeg_quality:         85,
         animation_max_secs:   3,
         animation_fps:        8,
         ffmpeg_path:          "ffmpeg".to_string(),
         transform_fallback:   TransformFallback::Original,
         prepare_concurrency:  4,
         remote_prefix:        "resized_".to_string(),
      }
   }
}

impl Config {
   /// Loads the layered configuration, creating the global config file with
   /// defaults on first use.
   pub fn load(explicit: Option<&Path>) -> Result<Self> {
      let global = ensure_global_config();
      Self::load_from(Some(&global), explicit)
   }

   /// Loads configuration from the given files plus the environment.
   pub fn load_from(global: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
      let mut figment = Figment::from(Serialized::defaults(Self::default()));
      if let Some(path) = global {
         figment = figment.merge(Toml::file(path));
      }
      if let Some(path) = explicit {
         figment = figment.merge(Toml::file(path));
      }

      let config: Self = figment
         .merge(Env::raw().only(&["immich_url", "immich_api_key"]))
         .merge(Env::raw().only(&["geekmagic_url"]).map(|_| "device_url".into()))
         .merge(Env::prefixed(ENV_PREFIX).lowercase(true))
         .extract()?;
      Ok(config)
   }

   fn create_default_config(path: &Path) {
      if let Some(parent) = path.parent() {
         let _ = fs::create_dir_all(parent);
      }
      if let Ok(toml) = toml::to_string_pretty(&Self::default()) {
         let _ = fs::write(path, toml);
      }
   }

   /// Checks the settings the device side of a run needs.
   pub fn validate_device(&self) -> Result<()> {
      if self.device_url.trim().is_empty() {
         return Err(
            ConfigError::Missing { key: "device_url", env: "MEMORIA_DEVICE_URL" }.into(),
         );
      }
      if self.probe_timeout_ms == 0 {
         return Err(
            ConfigError::Invalid {
               key:    "probe_timeout_ms",
               reason: "must be greater than zero".to_string(),
            }
            .into(),
         );
      }
      Ok(())
   }

   /// Checks everything a full sync needs.
   pub fn validate(&self) -> Result<()> {
      self.validate_device()?;
      if self.immich_url.trim().is_empty() {
         return Err(ConfigError::Missing { key: "immich_url", env: "MEMORIA_IMMICH_URL" }.into());
      }
      if self.immich_api_key.trim().is_empty() {
         return Err(
            ConfigError::Missing { key: "immich_api_key", env: "MEMORIA_IMMICH_API_KEY" }.into(),
         );
      }
      if self.target_width == 0 || self.target_height == 0 {
         return Err(
            ConfigError::Invalid {
               key:    "target_width/target_height",
               reason: format!("{}x{} has no pixels", self.target_width, self.target_height),
            }
            .into(),
         );
      }
      if !(1..=100).contains(&self.jpeg_quality) {
         return Err(
            ConfigError::Invalid {
               key:    "jpeg_quality",
               reason: format!("{} is outside 1..=100", self.jpeg_quality),
            }
            .into(),
         );
      }
      if self.years_back == 0 {
         return Err(
            ConfigError::Invalid { key: "years_back", reason: "must be at least 1".to_string() }
               .into(),
         );
      }
      Ok(())
   }

   pub const fn tier_map(&self) -> TierMap {
      TierMap { image: self.image_tier, video: self.video_tier }
   }

   pub const fn gate_delay(&self) -> Duration {
      Duration::from_secs(self.gate_delay_secs)
   }

   pub const fn probe_timeout(&self) -> Duration {
      Duration::from_millis(self.probe_timeout_ms)
   }

   pub const fn request_timeout(&self) -> Duration {
      Duration::from_secs(self.request_timeout_secs)
   }

   /// Parallel download/transform workers, never less than one.
   pub fn effective_prepare_concurrency(&self) -> usize {
      self.prepare_concurrency.clamp(1, 32)
   }

   /// Copy safe to print: secrets replaced.
   pub fn redacted(&self) -> Self {
      let mut copy = self.clone();
      if !copy.immich_api_key.is_empty() {
         copy.immich_api_key = "***".to_string();
      }
      copy
   }
}

/// Returns the base directory for memoria configuration
pub fn base_dir() -> &'static PathBuf {
   static ONCE: OnceLock<PathBuf> = OnceLock::new();
   ONCE.get_or_init(|| resolve_base_dir(".memoria"))
}

fn ensure_global_config() -> PathBuf {
   let config_path = config_file_path();
   if !config_path.exists() {
      Config::create_default_config(config_path);
   }
   config_path.to_path_buf()
}

fn resolve_base_dir(dir_name: &str) -> PathBuf {
   BaseDirs::new()
      .map(|d| d.home_dir().join(dir_name))
      .or_else(|| {
         std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(dir_name))
      })
      .unwrap_or_else(|| {
         std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(dir_name)
      })
}

macro_rules! define_paths {
   ($($fn_name:ident: $path:literal),* $(,)?) => {
      $(
         pub fn $fn_name() -> &'static PathBuf {
            static ONCE: OnceLock<PathBuf> = OnceLock::new();
            ONCE.get_or_init(|| base_dir().join($path))
         }
      )*
   };
}

define_paths! {
   config_file_path: "config.toml",
}
