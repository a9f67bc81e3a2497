use std::io::Write;

use memoria::{
   config::{Config, TransformFallback},
   types::PriorityTier,
};

fn write_toml(contents: &str) -> tempfile::NamedTempFile {
   let mut file = tempfile::Builder::new().suffix(".toml").tempfile().expect("temp file");
   file.write_all(contents.as_bytes()).expect("write config");
   file
}

#[test]
fn explicit_file_overrides_global_file() {
   let global = write_toml(
      r#"
device_url = "http://global.frame"
capacity_bytes = 1000
"#,
   );
   let explicit = write_toml(
      r#"
capacity_bytes = 2000
video_tier = "high"
transform_fallback = "skip"
"#,
   );

   let cfg = Config::load_from(Some(global.path()), Some(explicit.path())).expect("load");

   assert_eq!(cfg.device_url, "http://global.frame");
   assert_eq!(cfg.capacity_bytes, 2000);
   assert_eq!(cfg.video_tier, PriorityTier::High);
   assert_eq!(cfg.transform_fallback, TransformFallback::Skip);
   assert_eq!(cfg.match_token_len, 12);
}

#[test]
fn missing_files_fall_back_to_defaults() {
   let dir = tempfile::tempdir().expect("temp dir");
   let cfg = Config::load_from(Some(&dir.path().join("absent.toml")), None).expect("load");
   assert_eq!(cfg.gate_max_attempts, 3);
   assert_eq!(cfg.target_width, 240);
}

#[test]
fn malformed_value_is_a_config_error() {
   let bad = write_toml("capacity_bytes = \"lots\"\n");
   let err = Config::load_from(Some(bad.path()), None).expect_err("must fail");
   assert_eq!(err.exit_code(), 2);
}

#[test]
fn default_config_round_trips_through_toml() {
   let text = toml::to_string_pretty(&Config::default()).expect("serialize");
   let file = write_toml(&text);
   let cfg = Config::load_from(Some(file.path()), None).expect("load");
   assert_eq!(cfg.remote_prefix, "resized_");
   assert_eq!(cfg.image_tier, PriorityTier::High);
}
