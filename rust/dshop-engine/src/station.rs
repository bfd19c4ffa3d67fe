//! Workstations
//!
//! Each workstation instance owns a task queue sorted by the dispatching
//! rule, runs a processing loop as an explicit state machine, and keeps
//! idle/work bookkeeping. The loop suspends on a one-shot idle signal:
//! `parked` means the loop is waiting on the current signal, and
//! `signal_pending` means the current signal has already been fired. A
//! fired signal is always replaced with a fresh one when the loop resumes.

use crate::error::{SimError, SimResult};
use crate::events::EventKind;
use crate::loads::clip_indirect_load;
use crate::order::OrderId;
use crate::sim::{Simulation, Wake};
use crate::task::{TaskId, TaskState};
use dshop_config::DispatchRule;
use serde::Serialize;

/// Index of a workstation within the simulation's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StationId(pub usize);

/// A queued (order, task) pair
///
/// Process time, priority and planned start are copied in at enqueue time so
/// dispatch sorting and the direct load need no arena lookups.
#[derive(Debug, Clone, Copy)]
pub struct QueuedTask {
    /// Owning order
    pub order: OrderId,
    /// Queued task
    pub task: TaskId,
    /// Service demand
    pub process_time: f64,
    /// Order priority (0 = highest)
    pub priority: u8,
    /// Planned start time computed at enqueue
    pub planned_start: f64,
}

/// One workstation instance, e.g. "A-1"
#[derive(Debug)]
pub struct Station {
    /// Instance identifier: `type-instance`
    pub id: String,
    /// Workstation type, e.g. "A"
    pub type_id: String,
    /// Instance number within the type (1-based)
    pub instance: u32,
    /// Released (order, task) pairs awaiting or receiving service
    pub queue: Vec<QueuedTask>,
    /// Aggregated corrected load of tasks routed here but not yet enqueued
    pub indirect_load: f64,
    /// Whether the station is idle
    pub idle: bool,
    /// Whether the processing loop is suspended on the current idle signal
    pub parked: bool,
    /// Whether the current one-shot idle signal has been fired
    pub signal_pending: bool,
    /// Unit-capacity resource flag
    pub busy: bool,
    /// Start of the current idle period
    pub last_idle_start: f64,
    /// Start of the current work period
    pub last_work_start: f64,
    /// Accumulated idle time
    pub total_idle_time: f64,
    /// Accumulated work time
    pub total_work_time: f64,
    /// Operating cost per time unit
    pub cost_per_time_unit: f64,
}

impl Station {
    /// Create an idle workstation instance
    pub fn new(type_id: &str, instance: u32, cost_per_time_unit: f64) -> Self {
        Self {
            id: format!("{}-{}", type_id, instance),
            type_id: type_id.to_string(),
            instance,
            queue: Vec::new(),
            indirect_load: 0.0,
            idle: true,
            parked: false,
            signal_pending: false,
            busy: false,
            last_idle_start: 0.0,
            last_work_start: 0.0,
            total_idle_time: 0.0,
            total_work_time: 0.0,
            cost_per_time_unit,
        }
    }

    /// Work already queued here: sum of process times over the queue
    pub fn direct_load(&self) -> f64 {
        self.queue.iter().map(|qt| qt.process_time).sum()
    }

    /// Direct plus indirect load
    pub fn current_load(&self) -> f64 {
        self.direct_load() + self.indirect_load
    }

    /// Operating cost accrued so far
    pub fn total_cost(&self) -> f64 {
        self.total_work_time * self.cost_per_time_unit
    }

    /// Utilization over a run of the given length, in percent
    pub fn utilization(&self, simulation_time: f64) -> f64 {
        self.total_work_time / simulation_time * 100.0
    }

    /// Sort the queue by the dispatching rule
    ///
    /// Priority is always the primary key; sorts are stable, so FCFS keeps
    /// enqueue order within a priority class.
    pub fn sort_queue(&mut self, rule: DispatchRule) {
        match rule {
            DispatchRule::Fcfs => self.queue.sort_by(|a, b| a.priority.cmp(&b.priority)),
            DispatchRule::Spt => self.queue.sort_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(a.process_time.total_cmp(&b.process_time))
            }),
            DispatchRule::Pst => self.queue.sort_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(a.planned_start.total_cmp(&b.planned_start))
            }),
        }
    }
}

impl Simulation {
    /// Enqueue a ready task at its assigned station
    ///
    /// The task leaves the indirect load and enters the queue; an idle
    /// station is woken through its one-shot signal.
    pub(crate) fn add_task(&mut self, oid: OrderId, tid: TaskId) -> SimResult<()> {
        let now = self.queue.now();
        let (sid, task_name, process_time, load, station_type) = {
            let order = &self.orders[oid.0];
            let task = order.task(tid);
            let sid = task.assigned_station.ok_or_else(|| SimError::UnroutedTask {
                order: order.id.clone(),
                task: task.name.clone(),
            })?;
            (
                sid,
                task.name.clone(),
                task.process_time,
                task.corrected_load(),
                task.station_type.clone(),
            )
        };
        if self.stations[sid.0].type_id != station_type {
            return Err(SimError::StationMismatch {
                station: self.stations[sid.0].id.clone(),
                order: self.orders[oid.0].id.clone(),
                task: task_name,
            });
        }

        let planned_start = self.planned_start_time(oid, tid);

        {
            let station = &mut self.stations[sid.0];
            station.indirect_load -= load;
            clip_indirect_load(station, &task_name)?;
        }

        let priority = {
            let order = &mut self.orders[oid.0];
            let pos = order
                .ready_tasks
                .iter()
                .position(|&t| t == tid)
                .ok_or_else(|| SimError::TaskNotReady {
                    order: order.id.clone(),
                    task: task_name.clone(),
                })?;
            order.ready_tasks.remove(pos);
            let task = order.task_mut(tid);
            task.planned_start_time = Some(planned_start);
            task.state = TaskState::Queued;
            order.priority
        };

        let order_name = self.orders[oid.0].id.clone();
        let station = &mut self.stations[sid.0];
        station.queue.push(QueuedTask {
            order: oid,
            task: tid,
            process_time,
            priority,
            planned_start,
        });
        self.log.record(
            now,
            Some(&self.stations[sid.0].id),
            Some(&order_name),
            Some(&task_name),
            EventKind::TaskAdded,
            None,
        );

        if self.stations[sid.0].idle {
            if self.stations[sid.0].parked {
                self.stations[sid.0].parked = false;
                self.queue.schedule_at(now, Wake::IdleWake(sid));
            }
            // the fired signal is replaced with a fresh one
            self.stations[sid.0].signal_pending = false;
        }
        Ok(())
    }

    /// Fire a station's one-shot idle signal
    pub(crate) fn fire_idle_event(&mut self, sid: StationId) {
        let now = self.queue.now();
        if self.stations[sid.0].parked {
            self.stations[sid.0].parked = false;
            self.queue.schedule_at(now, Wake::IdleWake(sid));
        } else {
            self.stations[sid.0].signal_pending = true;
        }
    }

    /// Top of the processing loop: go idle or start the next task
    pub(crate) fn station_step(&mut self, sid: StationId) -> SimResult<()> {
        let now = self.queue.now();
        if self.stations[sid.0].queue.is_empty() {
            {
                let station = &mut self.stations[sid.0];
                station.idle = true;
                station.last_idle_start = now;
            }
            self.log.record(
                now,
                Some(&self.stations[sid.0].id),
                None,
                None,
                EventKind::IdleStart,
                None,
            );
            self.continuous_release(sid)?;
            let station = &mut self.stations[sid.0];
            if station.signal_pending {
                // the signal fired during continuous release; resume at once
                station.parked = false;
                self.queue.schedule_at(now, Wake::IdleWake(sid));
            } else {
                station.parked = true;
            }
            Ok(())
        } else {
            self.start_next_task(sid)
        }
    }

    /// Resumption after the idle signal fires
    pub(crate) fn idle_end(&mut self, sid: StationId) -> SimResult<()> {
        let now = self.queue.now();
        let duration = now - self.stations[sid.0].last_idle_start;
        {
            let station = &mut self.stations[sid.0];
            station.total_idle_time += duration;
            station.signal_pending = false;
            station.parked = false;
        }
        self.log.record(
            now,
            Some(&self.stations[sid.0].id),
            None,
            None,
            EventKind::IdleEnd,
            Some(format!("Idle duration: {:.2}", duration)),
        );
        self.station_step(sid)
    }

    /// Sort the queue and start processing its front task
    fn start_next_task(&mut self, sid: StationId) -> SimResult<()> {
        let now = self.queue.now();
        {
            let station = &mut self.stations[sid.0];
            station.idle = false;
            station.sort_queue(self.dispatch_rule);
        }
        let front = self.stations[sid.0].queue[0];
        let order_name = self.orders[front.order.0].id.clone();
        let task_name = self.orders[front.order.0].task(front.task).name.clone();
        if self.orders[front.order.0].task(front.task).assigned_station != Some(sid) {
            return Err(SimError::StationMismatch {
                station: self.stations[sid.0].id.clone(),
                order: order_name,
                task: task_name,
            });
        }

        debug_assert!(!self.stations[sid.0].busy, "unit-capacity resource violated");
        {
            let station = &mut self.stations[sid.0];
            station.busy = true;
            station.last_work_start = now;
        }
        self.orders[front.order.0].task_mut(front.task).state = TaskState::Running;
        self.log.record(
            now,
            Some(&self.stations[sid.0].id),
            Some(&order_name),
            Some(&task_name),
            EventKind::TaskStart,
            Some(format!("Process time: {:.2}", front.process_time)),
        );
        self.queue.schedule_after(
            front.process_time,
            Wake::TaskFinished {
                station: sid,
                order: front.order,
                task: front.task,
            },
        );
        Ok(())
    }

    /// Completion of a task's processing timeout
    pub(crate) fn finish_task(
        &mut self,
        sid: StationId,
        oid: OrderId,
        tid: TaskId,
    ) -> SimResult<()> {
        let now = self.queue.now();
        let process_time = self.orders[oid.0].task(tid).process_time;
        let task_name = self.orders[oid.0].task(tid).name.clone();
        let order_name = self.orders[oid.0].id.clone();

        {
            let station = &mut self.stations[sid.0];
            station.busy = false;
            station.total_work_time += process_time;
        }
        let station_id = self.stations[sid.0].id.clone();
        self.log.record(
            now,
            Some(&station_id),
            Some(&order_name),
            Some(&task_name),
            EventKind::TaskComplete,
            Some(format!(
                "TWT: {:.2}, TIT: {:.2}",
                self.stations[sid.0].total_work_time, self.stations[sid.0].total_idle_time
            )),
        );

        if let Some(component) = self.orders[oid.0].task(tid).produced_component.clone() {
            tracing::info!(
                "{:.2}: produced component {} from order {} added to the output warehouse",
                now,
                component,
                order_name
            );
            self.warehouse.add_item(component);
        }

        let pos = self.stations[sid.0]
            .queue
            .iter()
            .position(|qt| qt.order == oid && qt.task == tid)
            .ok_or_else(|| SimError::TaskNotInQueue {
                station: station_id.clone(),
                order: order_name.clone(),
                task: task_name.clone(),
            })?;

        // mark completed and promote direct children to ready
        {
            let order = &mut self.orders[oid.0];
            order.completed.insert(tid);
            order.task_mut(tid).state = TaskState::Completed;
            let children = order.task(tid).next_steps.clone();
            for child in children {
                order.task_mut(child).state = TaskState::Ready;
                order.ready_tasks.push(child);
            }
            if order.is_finished() {
                order.finish_time = now;
            }
        }
        if self.orders[oid.0].is_finished() {
            self.log.record(
                now,
                None,
                Some(&order_name),
                None,
                EventKind::OrderFinished,
                None,
            );
        }

        self.stations[sid.0].queue.remove(pos);
        self.update_station_loads_on_completion(oid, tid)?;
        tracing::info!(
            "{:.2}: task {} of order {} is completed",
            now,
            task_name,
            order_name
        );

        // dispatch the now-ready successors to their assigned stations
        let ready = self.orders[oid.0].ready_tasks.clone();
        for child in ready {
            self.add_task(oid, child)?;
            tracing::debug!(
                "{:.2}: task {} of order {} dispatched",
                now,
                self.orders[oid.0].task(child).name,
                order_name
            );
        }

        // resume the processing loop
        self.queue.schedule_at(now, Wake::Dispatch(sid));
        Ok(())
    }
}
