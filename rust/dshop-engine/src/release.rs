//! LUMS COR order release control
//!
//! Periodic release scans the pool in rule order and admits every order
//! whose projected load stays within the workload norm on all stations.
//! Continuous release is the corrected part: whenever a station goes idle,
//! the first pooled order with a ready task of that station's type is
//! released immediately, without the norm test — an idle station is worse
//! than a mild overload.

use crate::error::{SimError, SimResult};
use crate::events::EventKind;
use crate::order::{Order, OrderId};
use crate::sim::{Simulation, Wake};
use crate::station::StationId;
use crate::task::TaskId;
use dshop_config::PoolRule;

impl Simulation {
    /// An order has arrived: pool it and probe idle stations at once, so an
    /// order arriving to a starved shop need not wait for the next tick
    pub(crate) fn on_order_arrival(&mut self, oid: OrderId) -> SimResult<()> {
        let now = self.queue.now();
        let (order_name, task_count) = {
            let order = &self.orders[oid.0];
            (order.id.clone(), order.flat_plan.len())
        };
        tracing::info!("{:.2}: order {} arrives", now, order_name);
        self.pool.add(oid);
        self.log.record(
            now,
            None,
            Some(&order_name),
            None,
            EventKind::OrderArrival,
            Some(format!("{} tasks included", task_count)),
        );
        self.check_idle_stations()
    }

    /// Probe every idle station whose idle signal has not already fired
    pub(crate) fn check_idle_stations(&mut self) -> SimResult<()> {
        for i in 0..self.stations.len() {
            if self.stations[i].idle && !self.stations[i].signal_pending {
                self.continuous_release(StationId(i))?;
            }
        }
        Ok(())
    }

    /// Sort the pool by the sequencing rule; priority is always primary
    pub(crate) fn sort_pool(&mut self) {
        let now = self.queue.now();
        let rule = self.pool_rule;
        let orders = &self.orders;
        let list = self.pool.orders_mut();
        match rule {
            PoolRule::Fcfs => list.sort_by(|&a, &b| {
                let (oa, ob) = (&orders[a.0], &orders[b.0]);
                oa.priority
                    .cmp(&ob.priority)
                    .then(oa.arrival_time.total_cmp(&ob.arrival_time))
            }),
            PoolRule::Edd => list.sort_by(|&a, &b| {
                let (oa, ob) = (&orders[a.0], &orders[b.0]);
                oa.priority
                    .cmp(&ob.priority)
                    .then(oa.due_date.total_cmp(&ob.due_date))
            }),
            // Critical ratio: smaller is more urgent. No guards for a
            // non-positive slack; negative ratios simply sort first.
            PoolRule::Cr => list.sort_by(|&a, &b| {
                let (oa, ob) = (&orders[a.0], &orders[b.0]);
                let ra = (oa.due_date - now) / oa.total_process_time();
                let rb = (ob.due_date - now) / ob.total_process_time();
                oa.priority.cmp(&ob.priority).then(ra.total_cmp(&rb))
            }),
        }
    }

    /// One periodic release round, then reschedule the next tick
    pub(crate) fn periodic_release_round(&mut self) -> SimResult<()> {
        let now = self.queue.now();
        tracing::info!(
            "{:.2}: new round of periodic order release: {} orders remain",
            now,
            self.pool.len()
        );
        if !self.pool.is_empty() {
            self.sort_pool();
            for oid in self.pool.snapshot() {
                self.set_detailed_routing(oid, None)?;
                let (admissible, overloaded) = self.can_release(oid);
                let order_name = self.orders[oid.0].id.clone();
                if admissible {
                    self.log.record(
                        now,
                        None,
                        Some(&order_name),
                        None,
                        EventKind::OrderReleased,
                        Some("Periodic Release".to_string()),
                    );
                    tracing::info!(
                        "{:.2}: periodic release approved, order {} can be released",
                        now,
                        order_name
                    );
                    self.release_order(oid)?;
                    #[cfg(debug_assertions)]
                    self.debug_assert_admission(oid);
                } else {
                    let details: Vec<String> = overloaded
                        .iter()
                        .map(|&(sid, load)| {
                            format!("Station {}: {:.2}", self.stations[sid.0].id, load)
                        })
                        .collect();
                    tracing::info!(
                        "{:.2}: periodic release rejected, order {} cannot be released due to overloaded stations: {}",
                        now,
                        order_name,
                        details.join(", ")
                    );
                    self.log.record(
                        now,
                        None,
                        Some(&order_name),
                        None,
                        EventKind::OrderReleaseRejected,
                        Some(format!(
                            "Periodic Release - Overloaded Stations: {}",
                            details.join(", ")
                        )),
                    );
                }
            }
        }
        self.queue.schedule_after(self.round_time, Wake::PeriodicRelease);
        Ok(())
    }

    /// Starvation avoidance: release one order to an idle station
    ///
    /// Scans the sorted pool for the first order holding a ready task of the
    /// station's type, forces that type onto the triggering instance during
    /// routing, releases without the norm test, and fires the idle signal.
    /// At most one order per call; with no match the station stays idle.
    pub(crate) fn continuous_release(&mut self, sid: StationId) -> SimResult<()> {
        let now = self.queue.now();
        tracing::debug!(
            "{:.2}: station {} reported as idle, checking for orders",
            now,
            self.stations[sid.0].id
        );
        if !self.pool.is_empty() {
            self.sort_pool();
            let type_id = self.stations[sid.0].type_id.clone();
            for oid in self.pool.snapshot() {
                let matched = {
                    let order = &self.orders[oid.0];
                    order
                        .ready_tasks
                        .iter()
                        .copied()
                        .find(|&tid| order.task(tid).station_type == type_id)
                };
                if let Some(tid) = matched {
                    let order_name = self.orders[oid.0].id.clone();
                    let task_name = self.orders[oid.0].task(tid).name.clone();
                    let station_id = self.stations[sid.0].id.clone();
                    tracing::info!(
                        "{:.2}: continuous release, assigning order {} to station {}",
                        now,
                        order_name,
                        station_id
                    );
                    self.log.record(
                        now,
                        Some(&station_id),
                        Some(&order_name),
                        Some(&task_name),
                        EventKind::OrderReleased,
                        Some("Continuous Release".to_string()),
                    );
                    self.set_detailed_routing(oid, Some(sid))?;
                    self.release_order(oid)?;
                    self.fire_idle_event(sid);
                    return Ok(());
                }
            }
        }
        tracing::debug!(
            "{:.2}: no suitable order for station {}, remaining idle",
            now,
            self.stations[sid.0].id
        );
        Ok(())
    }

    /// Assign a workstation instance to every task of the order
    ///
    /// A task whose type matches the triggering station is forced onto that
    /// instance; otherwise the least-loaded instance of the matching type
    /// wins, ties to the first found. Rebuilds the contribution projection
    /// afterwards.
    pub(crate) fn set_detailed_routing(
        &mut self,
        oid: OrderId,
        triggered: Option<StationId>,
    ) -> SimResult<()> {
        let flat = self.orders[oid.0].flat_plan.clone();
        for tid in flat {
            let station_type = self.orders[oid.0].task(tid).station_type.clone();
            let chosen = match triggered {
                Some(forced) if self.stations[forced.0].type_id == station_type => forced,
                _ => self.least_loaded_station(&station_type)?,
            };
            self.orders[oid.0].task_mut(tid).assigned_station = Some(chosen);
            tracing::debug!(
                "task {} of order {} assigned to station {}",
                self.orders[oid.0].task(tid).name,
                self.orders[oid.0].id,
                self.stations[chosen.0].id
            );
        }
        self.orders[oid.0].compute_load_contributions()
    }

    /// The instance of a type with minimum current load, ties first-found
    pub(crate) fn least_loaded_station(&self, type_id: &str) -> SimResult<StationId> {
        let mut best: Option<(StationId, f64)> = None;
        for (i, station) in self.stations.iter().enumerate() {
            if station.type_id != type_id {
                continue;
            }
            let load = station.current_load();
            match best {
                Some((_, best_load)) if load >= best_load => {}
                _ => best = Some((StationId(i), load)),
            }
        }
        best.map(|(sid, _)| sid)
            .ok_or_else(|| SimError::NoStationForType {
                type_id: type_id.to_string(),
            })
    }

    /// Admission test: projected load within the norm on every station
    ///
    /// Returns the overloaded stations with their loads before adding the
    /// order's contribution.
    pub(crate) fn can_release(&self, oid: OrderId) -> (bool, Vec<(StationId, f64)>) {
        let totals = self.orders[oid.0].contribution_totals();
        let loads: Vec<String> = self
            .stations
            .iter()
            .map(|s| format!("{}: {:.2}", s.id, s.current_load()))
            .collect();
        tracing::info!(
            "{:.2}: check station loads before releasing order {}: {{{}}}",
            self.queue.now(),
            self.orders[oid.0].id,
            loads.join(", ")
        );
        let mut overloaded = Vec::new();
        for (i, station) in self.stations.iter().enumerate() {
            let current = station.current_load();
            let projected = current + totals.get(&StationId(i)).copied().unwrap_or(0.0);
            if projected > self.workload_norm {
                overloaded.push((StationId(i), current));
            }
        }
        (overloaded.is_empty(), overloaded)
    }

    /// Release an order to the shop floor
    ///
    /// Applies the contribution projection to the stations' indirect loads,
    /// enqueues a snapshot of the ready tasks at their assigned stations,
    /// and removes the order from the pool.
    pub(crate) fn release_order(&mut self, oid: OrderId) -> SimResult<()> {
        self.apply_load_contributions(oid);
        self.orders[oid.0].released = true;
        let ready = self.orders[oid.0].ready_tasks.clone();
        for tid in ready {
            self.add_task(oid, tid)?;
        }
        let order_name = self.orders[oid.0].id.clone();
        self.pool.remove(oid, &order_name)
    }

    /// Planned start time of a task at enqueue
    ///
    /// PST = due date − total process time of the most time-consuming
    /// remaining branch − allowance × branch task count.
    pub(crate) fn planned_start_time(&self, oid: OrderId, tid: TaskId) -> f64 {
        let order = &self.orders[oid.0];
        let (branch_time, branch_tasks) = longest_branch(order, tid);
        order.due_date - branch_time - self.pst_allowance * branch_tasks as f64
    }
}

/// Total process time and task count of the most time-consuming branch
/// starting at (and including) the given task; ties keep the first child
pub(crate) fn longest_branch(order: &Order, tid: TaskId) -> (f64, u32) {
    let task = order.task(tid);
    if task.next_steps.is_empty() {
        return (task.process_time, 1);
    }
    let mut best = (0.0, 0);
    for &child in &task.next_steps {
        let candidate = longest_branch(order, child);
        if candidate.0 > best.0 {
            best = candidate;
        }
    }
    (task.process_time + best.0, 1 + best.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::PlanNode;

    #[test]
    fn longest_branch_includes_the_task_itself() {
        // T1 forks into a 5+3 chain and a lone 2
        let plan = vec![PlanNode::new("T1", 2.0, "A")
            .with_child(PlanNode::new("T2", 5.0, "B").with_child(PlanNode::new("T4", 3.0, "D")))
            .with_child(PlanNode::new("T3", 2.0, "C"))];
        let order = Order::new("O-1", 2, 0.0, 20.0, "Tree", plan).unwrap();

        let (time, count) = longest_branch(&order, TaskId(0));
        assert_eq!(time, 10.0);
        assert_eq!(count, 3);

        // from T2 the branch is 5 + 3
        let (time, count) = longest_branch(&order, TaskId(1));
        assert_eq!(time, 8.0);
        assert_eq!(count, 2);

        // a leaf is its own branch
        let (time, count) = longest_branch(&order, TaskId(3));
        assert_eq!(time, 2.0);
        assert_eq!(count, 1);
    }

    #[test]
    fn longest_branch_ties_keep_the_first_child() {
        let plan = vec![PlanNode::new("T1", 1.0, "A")
            .with_child(PlanNode::new("T2", 4.0, "B"))
            .with_child(
                PlanNode::new("T3", 2.0, "C").with_child(PlanNode::new("T4", 2.0, "D")),
            )];
        let order = Order::new("O-1", 2, 0.0, 20.0, "Tie", plan).unwrap();
        // both branches total 4.0; the first child (one task) wins the tie
        let (time, count) = longest_branch(&order, TaskId(0));
        assert_eq!(time, 5.0);
        assert_eq!(count, 2);
    }
}
