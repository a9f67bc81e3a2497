//! CLI command implementations for memoria.
//!
//! Each module corresponds to a subcommand; shared client construction lives
//! here.

pub mod config;
pub mod list;
pub mod probe;
pub mod sync;

use crate::{
   Result,
   catalog::ImmichClient,
   config::Config,
   device::GeekMagicClient,
   transform::{AnimationSettings, MediaTransformer, StillSettings},
};

pub(crate) fn device_client(cfg: &Config) -> Result<GeekMagicClient> {
   GeekMagicClient::new(&cfg.device_url, cfg.probe_timeout(), cfg.request_timeout())
}

pub(crate) fn catalog_client(cfg: &Config) -> Result<ImmichClient> {
   ImmichClient::new(&cfg.immich_url, &cfg.immich_api_key, cfg.request_timeout())
}

pub(crate) fn transformer(cfg: &Config) -> MediaTransformer {
   MediaTransformer::new(
      StillSettings { width: cfg.target_width, height: cfg.target_height, quality: cfg.jpeg_quality },
      AnimationSettings {
         ffmpeg_path: cfg.ffmpeg_path.clone(),
         width:       cfg.target_width,
         height:      cfg.target_height,
         max_secs:    cfg.animation_max_secs,
         fps:         cfg.animation_fps,
      },
   )
}
