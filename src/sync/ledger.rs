use serde::Serialize;

use crate::types::DeviceFile;

/// Run-scoped byte budget of the device.
///
/// Built from an authoritative inventory; after that only confirmed uploads
/// move it, by the size the device reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityLedger {
   total_bytes:   u64,
   used_bytes:    u64,
   unknown_sizes: usize,
}

impl CapacityLedger {
   pub const fn new(total_bytes: u64, used_bytes: u64) -> Self {
      Self { total_bytes, used_bytes, unknown_sizes: 0 }
   }

   /// Sums the known sizes of `inventory`. Files without a size count as zero
   /// and are tallied in [`Self::unknown_sizes`].
   pub fn from_inventory(total_bytes: u64, inventory: &[DeviceFile]) -> Self {
      let mut used_bytes = 0u64;
      let mut unknown_sizes = 0usize;
      for file in inventory {
         match file.size_bytes {
            Some(size) => used_bytes = used_bytes.saturating_add(size),
            None => unknown_sizes += 1,
         }
      }

      let ledger = Self { total_bytes, used_bytes, unknown_sizes };
      if ledger.is_overcommitted() {
         tracing::warn!(
            "device reports {used_bytes} bytes used but capacity is {total_bytes}; \
             treating remaining capacity as zero"
         );
      }
      if unknown_sizes > 0 {
         tracing::debug!("{unknown_sizes} device file(s) have no reported size");
      }
      ledger
   }

   pub const fn total_bytes(&self) -> u64 {
      self.total_bytes
   }

   pub const fn used_bytes(&self) -> u64 {
      self.used_bytes
   }

   pub const fn unknown_sizes(&self) -> usize {
      self.unknown_sizes
   }

   /// `max(total - used, 0)`.
   pub const fn remaining_bytes(&self) -> u64 {
      self.total_bytes.saturating_sub(self.used_bytes)
   }

   pub const fn is_overcommitted(&self) -> bool {
      self.used_bytes > self.total_bytes
   }

   /// Records a confirmed upload of `bytes`.
   pub fn record_upload(&mut self, bytes: u64) {
      self.used_bytes = self.used_bytes.saturating_add(bytes);
   }
}
