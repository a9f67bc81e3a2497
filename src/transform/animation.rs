use bytes::Bytes;
use tokio::process::Command;

use crate::{Result, error::TransformError, transform::Artifact};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationSettings {
   pub ffmpeg_path: String,
   pub width:       u32,
   pub height:      u32,
   pub max_secs:    u32,
   pub fps:         u32,
}

impl AnimationSettings {
   /// `-vf` filter chain: frame rate, cover-scale, centre crop.
   pub fn filter(&self) -> String {
      format!(
         "fps={fps},scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}",
         fps = self.fps.max(1),
         w = self.width,
         h = self.height,
      )
   }
}

/// Cuts the first seconds of a video into a looping GIF.
pub async fn transcode_animation(source: &[u8], settings: &AnimationSettings) -> Result<Artifact> {
   let workdir = tempfile::tempdir()?;
   let input = workdir.path().join("source");
   let output = workdir.path().join("animation.gif");
   tokio::fs::write(&input, source).await?;

   let result = Command::new(&settings.ffmpeg_path)
      .arg("-y")
      .args(["-loglevel", "error"])
      .arg("-t")
      .arg(settings.max_secs.max(1).to_string())
      .arg("-i")
      .arg(&input)
      .arg("-vf")
      .arg(settings.filter())
      .args(["-loop", "0"])
      .arg(&output)
      .kill_on_drop(true)
      .output()
      .await
      .map_err(|source| TransformError::Spawn { program: settings.ffmpeg_path.clone(), source })?;

   if !result.status.success() {
      return Err(
         TransformError::Transcode {
            program: settings.ffmpeg_path.clone(),
            status:  result.status.to_string(),
            stderr:  String::from_utf8_lossy(&result.stderr).trim().to_string(),
         }
         .into(),
      );
   }

   let bytes = tokio::fs::read(&output).await?;
   Ok(Artifact { bytes: Bytes::from(bytes), mime: "image/gif", extension: "gif" })
}
