//! Converting downloaded originals into artifacts the device can show.
//!
//! Stills are centre-cropped and resized to the frame's resolution as JPEG;
//! videos are cut down to a short looping GIF with `ffmpeg`.

mod animation;
mod still;

use std::sync::Arc;

use bytes::Bytes;

pub use animation::{AnimationSettings, transcode_animation};
pub use still::{StillSettings, resize_still};
use crate::{Result, error::TransformError, types::MediaKind};

/// Output of a transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
   pub bytes:     Bytes,
   pub mime:      &'static str,
   pub extension: &'static str,
}

impl Artifact {
   pub fn size_bytes(&self) -> u64 {
      self.bytes.len() as u64
   }
}

/// Turns original media into a device-ready artifact.
#[async_trait::async_trait]
pub trait Transformer: Send + Sync {
   async fn transform(&self, source: Bytes, kind: MediaKind) -> Result<Artifact>;
}

#[async_trait::async_trait]
impl<T: Transformer + ?Sized> Transformer for Arc<T> {
   async fn transform(&self, source: Bytes, kind: MediaKind) -> Result<Artifact> {
      (**self).transform(source, kind).await
   }
}

/// Default transformer: `image` for stills, `ffmpeg` for animations.
#[derive(Debug, Clone)]
pub struct MediaTransformer {
   still:     StillSettings,
   animation: AnimationSettings,
}

impl MediaTransformer {
   pub const fn new(still: StillSettings, animation: AnimationSettings) -> Self {
      Self { still, animation }
   }
}

#[async_trait::async_trait]
impl Transformer for MediaTransformer {
   async fn transform(&self, source: Bytes, kind: MediaKind) -> Result<Artifact> {
      let artifact = match kind {
         MediaKind::Image => {
            let settings = self.still;
            tokio::task::spawn_blocking(move || resize_still(&source, settings))
               .await
               .map_err(|e| std::io::Error::other(e.to_string()))??
         },
         MediaKind::Video => transcode_animation(&source, &self.animation).await?,
      };

      if artifact.bytes.is_empty() {
         return Err(TransformError::EmptyOutput.into());
      }
      Ok(artifact)
   }
}

/// Artifact for an original uploaded as-is, when resizing is not possible.
pub fn passthrough(source: Bytes) -> Artifact {
   Artifact { bytes: source, mime: "image/jpeg", extension: "jpg" }
}
