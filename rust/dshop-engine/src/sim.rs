//! Simulation context and run loop
//!
//! One `Simulation` owns every arena (orders, stations), the pre-shop pool,
//! the event queue and the event log; components receive it explicitly, so
//! there is no process-wide state. Coroutines are explicit state machines
//! dispatched on `Wake` variants popped from the queue.

use crate::clock::EventQueue;
use crate::error::SimResult;
use crate::events::{EventKind, EventLog};
use crate::order::{Order, OrderId};
use crate::pool::PreShopPool;
use crate::station::{Station, StationId};
use crate::task::TaskId;
use crate::warehouse::Warehouse;
use dshop_config::{DispatchRule, PoolRule, SimulationConfig};

/// Wake-up variants driving the coroutine state machines
#[derive(Debug, Clone, Copy)]
pub enum Wake {
    /// Admit the next pending order
    OrderArrival,
    /// Run a periodic release round
    PeriodicRelease,
    /// First entry into a station's processing loop
    StationStart(StationId),
    /// A station's one-shot idle signal fired
    IdleWake(StationId),
    /// Loop resumption after a completed task
    Dispatch(StationId),
    /// A task's processing timeout elapsed
    TaskFinished {
        station: StationId,
        order: OrderId,
        task: TaskId,
    },
}

/// A complete simulation run: configuration, entities, clock and log
pub struct Simulation {
    pub(crate) queue: EventQueue<Wake>,
    /// Order arena; ids are indices
    pub orders: Vec<Order>,
    /// Orders in arrival sequence, admitted one wake-up at a time
    pub(crate) arrivals: Vec<OrderId>,
    pub(crate) next_arrival: usize,
    /// Station arena; ids are indices
    pub stations: Vec<Station>,
    pub(crate) pool: PreShopPool,
    /// The sole output warehouse
    pub warehouse: Warehouse,
    /// Structured event log for external consumers
    pub log: EventLog,
    pub(crate) pool_rule: PoolRule,
    pub(crate) dispatch_rule: DispatchRule,
    pub(crate) workload_norm: f64,
    pub(crate) round_time: f64,
    pub(crate) pst_allowance: f64,
    pub(crate) simulation_time: f64,
}

impl Simulation {
    /// Build a simulation from a validated configuration and a stream of
    /// fully-built orders
    ///
    /// Station instances are created per type in configuration order; the
    /// order stream is stably ordered by arrival time, so equal arrivals
    /// keep their stream order.
    pub fn new(config: &SimulationConfig, orders: Vec<Order>) -> Self {
        let mut stations = Vec::new();
        for type_id in &config.station_types {
            let count = config.station_instances.get(type_id).copied().unwrap_or(1);
            for instance in 1..=count {
                let station = Station::new(type_id, instance, config.cost_per_time_unit);
                tracing::info!("create workstation {}", station.id);
                stations.push(station);
            }
        }

        let mut arrivals: Vec<OrderId> = (0..orders.len()).map(OrderId).collect();
        arrivals.sort_by(|&a, &b| {
            orders[a.0]
                .arrival_time
                .total_cmp(&orders[b.0].arrival_time)
        });

        Self {
            queue: EventQueue::new(),
            orders,
            arrivals,
            next_arrival: 0,
            stations,
            pool: PreShopPool::new(),
            warehouse: Warehouse::new("output-warehouse"),
            log: EventLog::new(),
            pool_rule: config.pool_sequencing_rule,
            dispatch_rule: config.dispatching_rule,
            workload_norm: config.workload_norm,
            round_time: config.round_time,
            pst_allowance: config.planned_start_time_allowance,
            simulation_time: config.simulation_time,
        }
    }

    /// Current simulated time
    pub fn now(&self) -> f64 {
        self.queue.now()
    }

    /// Workload norm for the admission test
    pub fn workload_norm(&self) -> f64 {
        self.workload_norm
    }

    /// Configured run length
    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    /// Pool sequencing rule
    pub fn pool_rule(&self) -> PoolRule {
        self.pool_rule
    }

    /// Dispatching rule
    pub fn dispatch_rule(&self) -> DispatchRule {
        self.dispatch_rule
    }

    /// "pool + dispatch" label used in logs and summaries
    pub fn rules_label(&self) -> String {
        format!("{} + {}", self.pool_rule, self.dispatch_rule)
    }

    /// The pre-shop pool
    pub fn pool(&self) -> &PreShopPool {
        &self.pool
    }

    /// Run to the configured cut-off
    ///
    /// Wake-ups scheduled at or past the cut-off are discarded; unfinished
    /// orders are a normal outcome, reported through the summaries.
    pub fn run(&mut self) -> SimResult<()> {
        let until = self.simulation_time;
        self.log
            .record(0.0, None, None, None, EventKind::SimulationStart, None);

        for i in 0..self.stations.len() {
            self.queue.schedule_at(0.0, Wake::StationStart(StationId(i)));
        }
        if !self.arrivals.is_empty() {
            let first = self.orders[self.arrivals[0].0].arrival_time.max(0.0);
            self.queue.schedule_at(first, Wake::OrderArrival);
        }
        tracing::info!("0.00: start LUMS COR order release control");
        self.queue.schedule_at(self.round_time, Wake::PeriodicRelease);

        while let Some(wake) = self.queue.pop_before(until) {
            self.dispatch(wake)?;
        }

        self.finalize();
        Ok(())
    }

    fn dispatch(&mut self, wake: Wake) -> SimResult<()> {
        match wake {
            Wake::StationStart(sid) | Wake::Dispatch(sid) => self.station_step(sid),
            Wake::IdleWake(sid) => self.idle_end(sid),
            Wake::TaskFinished {
                station,
                order,
                task,
            } => self.finish_task(station, order, task),
            Wake::OrderArrival => self.next_order_arrival(),
            Wake::PeriodicRelease => self.periodic_release_round(),
        }
    }

    fn next_order_arrival(&mut self) -> SimResult<()> {
        let oid = self.arrivals[self.next_arrival];
        self.next_arrival += 1;
        self.on_order_arrival(oid)?;
        if self.next_arrival < self.arrivals.len() {
            let next = self.orders[self.arrivals[self.next_arrival].0]
                .arrival_time
                .max(self.queue.now());
            self.queue.schedule_at(next, Wake::OrderArrival);
        }
        Ok(())
    }

    /// Attribute each station's tail period to work or idle time and emit
    /// the closing log records
    fn finalize(&mut self) {
        let until = self.simulation_time;
        self.queue.advance_to(until);
        self.log
            .record(until, None, None, None, EventKind::SimulationEnd, None);
        for i in 0..self.stations.len() {
            let (id, details) = {
                let station = &mut self.stations[i];
                if !station.idle {
                    station.total_work_time += until - station.last_work_start;
                } else {
                    station.total_idle_time += until - station.last_idle_start;
                }
                (
                    station.id.clone(),
                    format!(
                        "FWT: {:.2}, FIT: {:.2}",
                        station.total_work_time, station.total_idle_time
                    ),
                )
            };
            self.log
                .record(until, Some(&id), None, None, EventKind::SimulationEnd, Some(details));
        }
    }
}
