use std::io;

use thiserror::Error;

/// Main error type for the memoria application.
///
/// Covers configuration, HTTP traffic with the catalog and the device, media
/// transforms, and the fatal run-level outcomes (unreachable device,
/// cancellation). Per-item collaborator failures inside a run are counted
/// rather than surfaced through this type.
#[derive(Debug, Error)]
pub enum Error {
   /// I/O error occurred during file or process operations.
   #[error("io error: {0}")]
   Io(#[from] io::Error),

   /// Configuration-related error occurred.
   #[error("config error: {0}")]
   Config(#[from] ConfigError),

   /// HTTP request or response error occurred.
   #[error("http error: {0}")]
   Http(#[from] HttpError),

   /// Media transform failed.
   #[error("transform error: {0}")]
   Transform(#[from] TransformError),

   /// JSON serialization or deserialization error occurred.
   #[error("json error: {0}")]
   Json(#[from] serde_json::Error),

   /// TOML serialization error occurred.
   #[error("toml error: {0}")]
   Toml(#[from] toml::ser::Error),

   /// The device never answered a reachability probe.
   #[error("device at {url} unreachable after {attempts} attempt(s)")]
   DeviceUnreachable { url: String, attempts: u32 },

   /// The run was cancelled before it could finish.
   #[error("run cancelled")]
   Cancelled,

   /// Error already reported to the user (e.g., JSON output emitted).
   #[error("{message}")]
   Reported { message: String, exit_code: i32 },
}

impl Error {
   pub fn exit_code(&self) -> i32 {
      match self {
         Self::Reported { exit_code, .. } => *exit_code,
         Self::Config(_) => 2,
         Self::DeviceUnreachable { .. } => 3,
         Self::Cancelled => 130,
         _ => 1,
      }
   }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
   /// Layered configuration could not be extracted.
   #[error("failed to parse config: {0}")]
   Parse(#[from] Box<figment::Error>),

   /// A required setting is empty.
   #[error("{key} is required; set it in config.toml, .env or the {env} environment variable")]
   Missing { key: &'static str, env: &'static str },

   /// A setting holds a value the engine cannot work with.
   #[error("invalid value for {key}: {reason}")]
   Invalid { key: &'static str, reason: String },
}

/// Errors that can occur during HTTP operations.
#[derive(Debug, Error)]
pub enum HttpError {
   /// HTTP request failed (network error, timeout, etc.).
   #[error("request failed: {0}")]
   Request(#[from] reqwest::Error),

   /// Received an invalid or unexpected HTTP status code.
   #[error("invalid status code: {0}")]
   StatusCode(u16),
}

/// Errors produced while resizing stills or transcoding animations.
#[derive(Debug, Error)]
pub enum TransformError {
   /// Source image could not be decoded or the output encoded.
   #[error("image error: {0}")]
   Image(#[from] image::ImageError),

   /// Source has a zero dimension and cannot be cropped.
   #[error("image has no pixels")]
   EmptyImage,

   /// The transcoder binary could not be started.
   #[error("failed to run {program}: {source}")]
   Spawn {
      program: String,
      #[source]
      source:  io::Error,
   },

   /// The transcoder exited unsuccessfully.
   #[error("{program} exited with {status}: {stderr}")]
   Transcode { program: String, status: String, stderr: String },

   /// The transform produced an empty artifact.
   #[error("transform produced no output")]
   EmptyOutput,
}

impl From<reqwest::Error> for Error {
   fn from(e: reqwest::Error) -> Self {
      Self::Http(HttpError::Request(e))
   }
}

impl From<figment::Error> for Error {
   fn from(e: figment::Error) -> Self {
      Self::Config(ConfigError::Parse(Box::new(e)))
   }
}

/// Standard result type using [`enum@Error`] as the default error type
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn exit_codes_distinguish_fatal_outcomes() {
      let unreachable = Error::DeviceUnreachable { url: "http://frame".into(), attempts: 3 };
      assert_eq!(unreachable.exit_code(), 3);
      assert_eq!(Error::Cancelled.exit_code(), 130);
      assert_eq!(
         Error::Config(ConfigError::Missing { key: "device_url", env: "MEMORIA_DEVICE_URL" })
            .exit_code(),
         2
      );
      assert_eq!(Error::Reported { message: "x".into(), exit_code: 7 }.exit_code(), 7);
      assert_eq!(Error::Http(HttpError::StatusCode(500)).exit_code(), 1);
   }
}
