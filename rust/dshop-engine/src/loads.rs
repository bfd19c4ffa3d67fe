//! Load accounting
//!
//! The release controller admits orders against a projection of their
//! remaining demand per station. A task's contribution is its process time
//! discounted by its remaining depth; each upstream completion moves the
//! whole subtree one step closer to execution, so depths decrement and
//! contributions rise until a task enters a queue and counts at full
//! process time. Slightly negative float residue is clipped to zero within
//! a tolerance; anything beyond is a fatal consistency violation.

use crate::constants::{CONSERVATION_EPSILON, LOAD_TOLERANCE};
use crate::error::{SimError, SimResult};
use crate::order::{Contribution, Order, OrderId};
use crate::sim::Simulation;
use crate::station::{Station, StationId};
use crate::task::{TaskId, TaskState};
use std::collections::BTreeMap;

/// Clip float residue in [-tolerance, 0) to zero; fail beyond it
pub(crate) fn clip_indirect_load(station: &mut Station, task_name: &str) -> SimResult<()> {
    if station.indirect_load < 0.0 && station.indirect_load.abs() < LOAD_TOLERANCE {
        station.indirect_load = 0.0;
    }
    if station.indirect_load < 0.0 {
        return Err(SimError::NegativeLoad {
            station: station.id.clone(),
            task: task_name.to_string(),
            load: station.indirect_load,
        });
    }
    Ok(())
}

impl Order {
    /// Rebuild the per-station contribution projection from scratch
    ///
    /// Covers every non-completed task of the flat plan, so re-routing
    /// between instances across periodic rounds never leaves stale entries.
    pub fn compute_load_contributions(&mut self) -> SimResult<()> {
        let mut contributions: BTreeMap<StationId, BTreeMap<String, Contribution>> =
            BTreeMap::new();
        for &tid in &self.flat_plan {
            let task = &self.tasks[tid.0];
            if task.is_completed() {
                continue;
            }
            let sid = task.assigned_station.ok_or_else(|| SimError::UnroutedTask {
                order: self.id.clone(),
                task: task.name.clone(),
            })?;
            contributions.entry(sid).or_default().insert(
                task.name.clone(),
                Contribution {
                    load: task.corrected_load(),
                    depth: task.remaining_depth,
                },
            );
        }
        self.load_contributions = contributions;
        Ok(())
    }

    /// Summed contribution per station
    pub fn contribution_totals(&self) -> BTreeMap<StationId, f64> {
        self.load_contributions
            .iter()
            .map(|(&sid, tasks)| (sid, tasks.values().map(|c| c.load).sum()))
            .collect()
    }
}

impl Simulation {
    /// Add an order's contributions to the stations' indirect loads
    pub(crate) fn apply_load_contributions(&mut self, oid: OrderId) {
        for (sid, tasks) in &self.orders[oid.0].load_contributions {
            let station = &mut self.stations[sid.0];
            for contribution in tasks.values() {
                station.indirect_load += contribution.load;
            }
        }
    }

    /// Completion callback: reflect that the completed task's subtree moved
    /// one step closer to execution
    ///
    /// For every task of the subtree in pre-order: subtract its current
    /// corrected load from its assigned station, decrement its remaining
    /// depth, add the new corrected load back. The contribution map is then
    /// rebuilt from scratch; both paths must agree, which the debug build
    /// asserts.
    pub(crate) fn update_station_loads_on_completion(
        &mut self,
        oid: OrderId,
        completed: TaskId,
    ) -> SimResult<()> {
        let mut stack: Vec<TaskId> = self.orders[oid.0]
            .task(completed)
            .next_steps
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(tid) = stack.pop() {
            let (sid, old_load, task_name) = {
                let order = &self.orders[oid.0];
                let task = order.task(tid);
                debug_assert!(
                    matches!(task.state, TaskState::Pending | TaskState::Ready),
                    "queued or completed task below a completing task"
                );
                let sid = task.assigned_station.ok_or_else(|| SimError::UnroutedTask {
                    order: order.id.clone(),
                    task: task.name.clone(),
                })?;
                (sid, task.corrected_load(), task.name.clone())
            };
            {
                let station = &mut self.stations[sid.0];
                station.indirect_load -= old_load;
                clip_indirect_load(station, &task_name)?;
            }
            let new_load = {
                let task = self.orders[oid.0].task_mut(tid);
                task.remaining_depth -= 1;
                debug_assert!(task.remaining_depth >= 1, "depth underflow");
                task.corrected_load()
            };
            self.stations[sid.0].indirect_load += new_load;
            for &child in self.orders[oid.0].task(tid).next_steps.iter().rev() {
                stack.push(child);
            }
        }

        self.orders[oid.0].compute_load_contributions()?;
        #[cfg(debug_assertions)]
        self.assert_load_conservation();
        Ok(())
    }

    /// Verify load conservation: each station's indirect load equals the
    /// projection over all released orders' routed, not-yet-queued,
    /// not-completed tasks
    pub fn check_load_conservation(&self) -> SimResult<()> {
        let mut expected = vec![0.0f64; self.stations.len()];
        for order in &self.orders {
            if !order.released {
                continue;
            }
            for task in &order.tasks {
                if !matches!(task.state, TaskState::Pending | TaskState::Ready) {
                    continue;
                }
                if let Some(sid) = task.assigned_station {
                    expected[sid.0] += task.corrected_load();
                }
            }
        }
        for (i, station) in self.stations.iter().enumerate() {
            if (station.indirect_load - expected[i]).abs() > CONSERVATION_EPSILON {
                return Err(SimError::LoadConservation {
                    station: station.id.clone(),
                    expected: expected[i],
                    actual: station.indirect_load,
                });
            }
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    pub(crate) fn assert_load_conservation(&self) {
        if let Err(violation) = self.check_load_conservation() {
            panic!("{}", violation);
        }
    }

    /// Admission contract check after a periodic release: every station the
    /// order contributed to stays within the workload norm
    #[cfg(debug_assertions)]
    pub(crate) fn debug_assert_admission(&self, oid: OrderId) {
        for (&sid, tasks) in &self.orders[oid.0].load_contributions {
            if tasks.values().map(|c| c.load).sum::<f64>() <= 0.0 {
                continue;
            }
            let station = &self.stations[sid.0];
            debug_assert!(
                station.current_load() <= self.workload_norm + CONSERVATION_EPSILON,
                "admission contract violated at station {} after releasing {}: load {}",
                station.id,
                self.orders[oid.0].id,
                station.current_load()
            );
        }
    }
}
