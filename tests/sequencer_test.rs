mod support;

use memoria::{
   sync::{CapacityLedger, Sequencer},
   types::{PriorityTier, SyncPhase, SyncProgress},
};
use support::{FakeDevice, asset};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn uploads_in_plan_order_and_moves_the_ledger() {
   let device = FakeDevice::new();
   let selected = vec![
      asset("one", 2019, PriorityTier::High, 30),
      asset("two", 2020, PriorityTier::High, 20),
   ];
   let mut ledger = CapacityLedger::new(100, 10);

   let report = Sequencer::new(&device)
      .execute(&selected, &mut ledger, &CancellationToken::new(), &mut ())
      .await;

   assert_eq!(report.uploaded_count, 2);
   assert_eq!(report.uploaded_bytes, 50);
   assert_eq!(ledger.remaining_bytes(), 40);
   assert_eq!(device.uploaded(), vec!["resized_one.jpg", "resized_two.jpg"]);
}

#[tokio::test]
async fn ledger_follows_the_size_the_device_reports() {
   let device = FakeDevice::new().report_size(7);
   let selected = vec![
      asset("one", 2019, PriorityTier::High, 30),
      asset("two", 2020, PriorityTier::High, 20),
   ];
   let mut ledger = CapacityLedger::new(100, 10);

   let report = Sequencer::new(&device)
      .execute(&selected, &mut ledger, &CancellationToken::new(), &mut ())
      .await;

   assert_eq!(report.uploaded_count, 2);
   assert_eq!(report.uploaded_bytes, 14);
   assert_eq!(ledger.used_bytes(), 24);
   assert_eq!(ledger.remaining_bytes(), 76);
}

#[tokio::test]
async fn failed_upload_is_counted_and_skipped() {
   let device = FakeDevice::new().fail_upload("two");
   let selected = vec![
      asset("one", 2019, PriorityTier::High, 30),
      asset("two", 2020, PriorityTier::High, 20),
      asset("three", 2021, PriorityTier::High, 10),
   ];
   let mut ledger = CapacityLedger::new(100, 0);

   let report = Sequencer::new(&device)
      .execute(&selected, &mut ledger, &CancellationToken::new(), &mut ())
      .await;

   assert_eq!(report.uploaded_count, 2);
   assert_eq!(report.failed_count, 1);
   assert_eq!(ledger.used_bytes(), 40);
   assert_eq!(device.uploaded(), vec!["resized_one.jpg", "resized_three.jpg"]);
}

#[tokio::test]
async fn cancellation_leaves_remaining_items_unattempted() {
   let device = FakeDevice::new();
   let selected = vec![
      asset("one", 2019, PriorityTier::High, 1),
      asset("two", 2020, PriorityTier::High, 1),
   ];
   let cancel = CancellationToken::new();
   let trigger = cancel.clone();
   let mut ledger = CapacityLedger::new(100, 0);
   // Cancel as soon as the first upload is announced.
   let mut on_progress = move |p: SyncProgress| {
      if p.phase == SyncPhase::Upload && p.processed == 0 {
         trigger.cancel();
      }
   };

   let report = Sequencer::new(&device)
      .execute(&selected, &mut ledger, &cancel, &mut on_progress)
      .await;

   assert!(report.cancelled);
   assert_eq!(report.uploaded_count, 1);
   assert_eq!(report.not_attempted, 1);
   assert_eq!(device.uploaded(), vec!["resized_one.jpg"]);
}
