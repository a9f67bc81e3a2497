//! Availability gate: fixed-interval, bounded retries until the device answers.
//!
//! The frame is usually powered on a schedule, so there is no backoff: the
//! gate probes, waits the configured delay, and probes again, at most
//! `max_attempts` times.

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::device::Device;

/// How the gate waits between attempts.
#[async_trait::async_trait]
pub trait Delay: Send + Sync {
   async fn wait(&self, duration: Duration);
}

/// Real-time delay backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait::async_trait]
impl Delay for TokioDelay {
   async fn wait(&self, duration: Duration) {
      tokio::time::sleep(duration).await;
   }
}

/// What happened at the gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateOutcome {
   pub reachable: bool,
   pub attempts:  u32,
   pub delays:    u32,
   pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct Gate<W = TokioDelay> {
   max_attempts: u32,
   delay:        Duration,
   waiter:       W,
}

impl Gate<TokioDelay> {
   /// `max_attempts` of zero is treated as one.
   pub const fn new(max_attempts: u32, delay: Duration) -> Self {
      Self { max_attempts, delay, waiter: TokioDelay }
   }
}

impl<W: Delay> Gate<W> {
   pub fn with_delay<V: Delay>(self, waiter: V) -> Gate<V> {
      Gate { max_attempts: self.max_attempts, delay: self.delay, waiter }
   }

   pub const fn max_attempts(&self) -> u32 {
      if self.max_attempts == 0 { 1 } else { self.max_attempts }
   }

   /// Probes until the device answers or attempts run out. The cancellation
   /// token is checked before every wait, and cancels a wait in progress.
   pub async fn await_reachable<D: Device + ?Sized>(
      &self,
      device: &D,
      cancel: &CancellationToken,
   ) -> GateOutcome {
      let max = self.max_attempts();
      let mut outcome = GateOutcome::default();

      for attempt in 1..=max {
         outcome.attempts = attempt;
         if device.probe().await {
            if attempt > 1 {
               tracing::info!("device reachable after {attempt} attempt(s)");
            }
            outcome.reachable = true;
            return outcome;
         }
         tracing::warn!("device not reachable (attempt {attempt}/{max})");

         if attempt == max {
            break;
         }
         if cancel.is_cancelled() {
            outcome.cancelled = true;
            break;
         }

         outcome.delays += 1;
         tokio::select! {
            biased;
            () = cancel.cancelled() => {
               outcome.cancelled = true;
               break;
            },
            () = self.waiter.wait(self.delay) => {},
         }
      }

      outcome
   }
}
