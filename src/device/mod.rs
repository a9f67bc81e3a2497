//! Display device abstraction with a GeekMagic HTTP implementation.

mod geekmagic;

use std::sync::Arc;

use bytes::Bytes;

pub use geekmagic::{GeekMagicClient, parse_listing};
use crate::{Result, types::DeviceFile};

/// Operations the reconciliation core needs from the device.
///
/// Calls are issued one at a time; implementations need not support
/// concurrent writes.
#[async_trait::async_trait]
pub trait Device: Send + Sync {
   /// Single reachability check with its own short timeout.
   async fn probe(&self) -> bool;

   /// Lists the files in the device's image store.
   async fn list(&self) -> Result<Vec<DeviceFile>>;

   /// Deletes one file by its remote name.
   async fn delete(&self, name: &str) -> Result<()>;

   /// Uploads one file and returns the number of bytes the device accepted.
   async fn upload(&self, name: &str, payload: Bytes, mime: &str) -> Result<u64>;
}

#[async_trait::async_trait]
impl<T: Device + ?Sized> Device for Arc<T> {
   async fn probe(&self) -> bool {
      (**self).probe().await
   }

   async fn list(&self) -> Result<Vec<DeviceFile>> {
      (**self).list().await
   }

   async fn delete(&self, name: &str) -> Result<()> {
      (**self).delete(name).await
   }

   async fn upload(&self, name: &str, payload: Bytes, mime: &str) -> Result<u64> {
      (**self).upload(name, payload, mime).await
   }
}
