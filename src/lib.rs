//! Keeps a storage-constrained photo frame stocked with "on this day"
//! memories from a photo catalog.

pub mod catalog;
pub mod cmd;
pub mod config;
pub mod device;
pub mod error;
pub mod prepare;
pub mod report;
pub mod sync;
pub mod transform;
pub mod types;
pub mod util;

pub use error::{Error, Result};
