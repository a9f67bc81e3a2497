//! Capacity planner: fair, deterministic selection under a byte budget.
//!
//! When everything fits, everything is selected in input order. Otherwise the
//! items are split by group (year) and tier, and each tier is allocated with a
//! round-robin over the groups in ascending key order: one cursor per group,
//! one item inspected per group per round. An item that does not fit the
//! remaining budget is skipped for good and the cursor moves on, so a single
//! oversized item never blocks the rest of its group. The high tier is
//! allocated completely before the low tier gets whatever budget is left.
//!
//! This is not a knapsack optimum; the point is that every year gets a turn in
//! every round and cheap stills are not crowded out by an early animation.

use std::collections::BTreeMap;

use crate::types::{DesiredAsset, PriorityTier};

/// What the planner needs to know about an item.
pub trait Allocatable {
   fn group_key(&self) -> i32;
   fn tier(&self) -> PriorityTier;
   fn cost_bytes(&self) -> u64;
}

impl Allocatable for DesiredAsset {
   fn group_key(&self) -> i32 {
      self.group_key
   }

   fn tier(&self) -> PriorityTier {
      self.tier
   }

   fn cost_bytes(&self) -> u64 {
      self.cost_bytes
   }
}

/// Planner output. `selected` is in upload order; `deferred` keeps input
/// order and holds everything that was not selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPlan<T = DesiredAsset> {
   pub selected:     Vec<T>,
   pub deferred:     Vec<T>,
   pub budget_bytes: u64,
   pub fast_path:    bool,
}

impl<T: Allocatable> SelectionPlan<T> {
   pub fn selected_bytes(&self) -> u64 {
      sum_costs(&self.selected)
   }

   pub fn deferred_bytes(&self) -> u64 {
      sum_costs(&self.deferred)
   }
}

fn sum_costs<T: Allocatable>(items: &[T]) -> u64 {
   items
      .iter()
      .map(Allocatable::cost_bytes)
      .fold(0u64, u64::saturating_add)
}

/// Chooses which of `processed` to upload within `remaining_bytes`.
pub fn select<T: Allocatable>(processed: Vec<T>, remaining_bytes: u64) -> SelectionPlan<T> {
   if sum_costs(&processed) <= remaining_bytes {
      return SelectionPlan {
         selected:     processed,
         deferred:     Vec::new(),
         budget_bytes: remaining_bytes,
         fast_path:    true,
      };
   }

   let order = allocation_order(&processed, remaining_bytes);

   let mut slots: Vec<Option<T>> = processed.into_iter().map(Some).collect();
   let selected: Vec<T> = order.iter().filter_map(|&i| slots[i].take()).collect();
   let deferred: Vec<T> = slots.into_iter().flatten().collect();

   tracing::debug!(
      "planned {} item(s), deferred {} within {remaining_bytes} bytes",
      selected.len(),
      deferred.len()
   );

   SelectionPlan { selected, deferred, budget_bytes: remaining_bytes, fast_path: false }
}

/// Indices into `items` in selection order.
fn allocation_order<T: Allocatable>(items: &[T], budget: u64) -> Vec<usize> {
   // group key -> [high lane, low lane], both in input order
   let mut groups: BTreeMap<i32, [Vec<usize>; 2]> = BTreeMap::new();
   for (idx, item) in items.iter().enumerate() {
      let lanes = groups.entry(item.group_key()).or_default();
      lanes[lane_index(item.tier())].push(idx);
   }

   let mut remaining = budget;
   let mut order = Vec::new();
   for tier in PriorityTier::ALL {
      if remaining == 0 {
         break;
      }
      let lanes: Vec<&[usize]> = groups
         .values()
         .map(|l| l[lane_index(tier)].as_slice())
         .collect();
      round_robin(items, &lanes, &mut remaining, &mut order);
   }
   order
}

const fn lane_index(tier: PriorityTier) -> usize {
   match tier {
      PriorityTier::High => 0,
      PriorityTier::Low => 1,
   }
}

fn round_robin<T: Allocatable>(
   items: &[T],
   lanes: &[&[usize]],
   remaining: &mut u64,
   order: &mut Vec<usize>,
) {
   let mut cursors = vec![0usize; lanes.len()];
   loop {
      let mut inspected = false;
      for (lane, cursor) in lanes.iter().zip(cursors.iter_mut()) {
         if *remaining == 0 {
            return;
         }
         let Some(&idx) = lane.get(*cursor) else {
            continue;
         };
         *cursor += 1;
         inspected = true;

         let cost = items[idx].cost_bytes();
         if cost <= *remaining {
            *remaining -= cost;
            order.push(idx);
         }
      }
      if !inspected {
         return;
      }
   }
}
