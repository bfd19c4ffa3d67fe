//! Order generation from disassembly process plans
//!
//! Loads JSON process plans and flattens them into order streams: one of
//! the loaded plans per order, pruned to a random depth, with Erlang-2
//! process times, exponential inter-arrival times, uniform due-date slack
//! and weighted priorities. All randomness comes from one seeded RNG, so a
//! scenario's order stream is reproducible bit for bit.

use anyhow::{bail, Context, Result};
use dshop_config::OrderGenConfig;
use dshop_engine::{Order, PlanNode};
use serde::Deserialize;
use std::path::Path;

/// One task of a disassembly process plan file
#[derive(Debug, Clone, Deserialize)]
pub struct PlanTask {
    /// Task name, e.g. "T1"
    pub task: String,
    /// Workstation type executing this task
    pub station: String,
    /// Lower bound of the process time
    pub time_min: f64,
    /// Upper bound of the process time
    pub time_max: f64,
    /// Component recovered by this task
    #[serde(default)]
    pub produced_component: Option<String>,
    /// Revenue on completion
    #[serde(default)]
    pub revenue: f64,
    /// Successor tasks
    #[serde(default)]
    pub next_steps: Vec<PlanTask>,
}

/// A disassembly process plan file
#[derive(Debug, Clone, Deserialize)]
pub struct DisassemblyPlan {
    /// Plan name
    pub process_plan: String,
    /// Roots of the disassembly task forest
    pub disassembly_flow: Vec<PlanTask>,
}

/// Load every `*.json` plan in a directory, sorted by file name
pub fn load_plans(dir: &Path) -> Result<Vec<DisassemblyPlan>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("reading plan directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    if paths.is_empty() {
        bail!("no process plans found in {}", dir.display());
    }
    let mut plans = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let plan: DisassemblyPlan = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        plans.push(plan);
    }
    Ok(plans)
}

/// Stochastic plan-flattener producing a reproducible order stream
pub struct OrderGenerator {
    config: OrderGenConfig,
    rng: fastrand::Rng,
}

impl OrderGenerator {
    /// Create a generator with its own seeded RNG
    pub fn new(config: OrderGenConfig, seed: u64) -> Self {
        Self {
            config,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Generate the configured number of orders from the loaded plans
    pub fn generate(&mut self, plans: &[DisassemblyPlan]) -> Result<Vec<Order>> {
        if plans.is_empty() {
            bail!("no process plans to generate orders from");
        }
        let mut orders = Vec::with_capacity(self.config.total_orders as usize);
        let mut arrival_time = 0.0;
        for index in 0..self.config.total_orders {
            let plan = &plans[self.rng.usize(..plans.len())];
            let order = self.generate_order(index, plan, arrival_time)?;
            orders.push(order);
            arrival_time += self.exponential(self.config.inter_arrival_mean);
        }
        Ok(orders)
    }

    fn generate_order(
        &mut self,
        index: u32,
        plan: &DisassemblyPlan,
        arrival_time: f64,
    ) -> Result<Order> {
        let max_depth = 1 + self.rng.u32(..self.config.max_plan_depth);
        let (lo, hi) = self.config.due_date_range;
        let due_date = arrival_time + lo + (hi - lo) * self.rng.f64();
        let priority = self.weighted_priority();

        let mut roots = Vec::new();
        for task in &plan.disassembly_flow {
            if let Some(node) = self.flatten_task(task, 1, max_depth) {
                roots.push(node);
            }
        }
        Order::new(
            &format!("O-{}", index + 1),
            priority,
            arrival_time,
            due_date,
            &plan.process_plan,
            roots,
        )
        .with_context(|| format!("building order O-{}", index + 1))
    }

    /// Recursively turn plan tasks into plan nodes, pruning past the depth
    fn flatten_task(&mut self, task: &PlanTask, depth: u32, max_depth: u32) -> Option<PlanNode> {
        if depth > max_depth {
            return None;
        }
        let process_time = self.erlang_process_time(task.time_min, task.time_max);
        let mut node = PlanNode {
            name: task.task.clone(),
            process_time,
            station_type: task.station.clone(),
            produced_component: task.produced_component.clone(),
            revenue: task.revenue,
            children: Vec::new(),
        };
        for child in &task.next_steps {
            if let Some(child_node) = self.flatten_task(child, depth + 1, max_depth) {
                node.children.push(child_node);
            }
        }
        Some(node)
    }

    /// Erlang-2 sample scaled into the [min, max] band, rounded to 2 decimals
    ///
    /// Erlang with shape 2 is the sum of two unit exponentials; the band
    /// scaling divides by the mean, so samples can overshoot `max` the same
    /// way the gamma draw can.
    fn erlang_process_time(&mut self, min_time: f64, max_time: f64) -> f64 {
        let erlang = self.exponential(1.0) + self.exponential(1.0);
        let scaled = min_time + (max_time - min_time) * (erlang / 2.0);
        (scaled * 100.0).round() / 100.0
    }

    fn exponential(&mut self, mean: f64) -> f64 {
        -mean * (1.0 - self.rng.f64()).ln()
    }

    fn weighted_priority(&mut self) -> u8 {
        let weights = self.config.priority_weights;
        let total: f64 = weights.iter().sum();
        let mut draw = self.rng.f64() * total;
        for (priority, weight) in weights.iter().enumerate() {
            if draw < *weight {
                return priority as u8;
            }
            draw -= weight;
        }
        (weights.len() - 1) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_plan() -> DisassemblyPlan {
        DisassemblyPlan {
            process_plan: "PlanX".to_string(),
            disassembly_flow: vec![PlanTask {
                task: "T1".to_string(),
                station: "A".to_string(),
                time_min: 2.0,
                time_max: 4.0,
                produced_component: Some("casing".to_string()),
                revenue: 30.0,
                next_steps: vec![PlanTask {
                    task: "T2".to_string(),
                    station: "B".to_string(),
                    time_min: 1.0,
                    time_max: 3.0,
                    produced_component: None,
                    revenue: 10.0,
                    next_steps: vec![PlanTask {
                        task: "T3".to_string(),
                        station: "C".to_string(),
                        time_min: 1.0,
                        time_max: 2.0,
                        produced_component: None,
                        revenue: 15.0,
                        next_steps: Vec::new(),
                    }],
                }],
            }],
        }
    }

    fn small_config() -> OrderGenConfig {
        OrderGenConfig {
            total_orders: 20,
            inter_arrival_mean: 1.0,
            due_date_range: (10.0, 20.0),
            max_plan_depth: 3,
            priority_weights: [0.1, 0.2, 0.7],
        }
    }

    #[test]
    fn same_seed_gives_the_same_stream() {
        let plans = vec![chain_plan()];
        let orders_a = OrderGenerator::new(small_config(), 44)
            .generate(&plans)
            .unwrap();
        let orders_b = OrderGenerator::new(small_config(), 44)
            .generate(&plans)
            .unwrap();
        assert_eq!(orders_a.len(), orders_b.len());
        for (a, b) in orders_a.iter().zip(&orders_b) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.arrival_time, b.arrival_time);
            assert_eq!(a.due_date, b.due_date);
            assert_eq!(a.priority, b.priority);
            assert_eq!(a.total_process_time(), b.total_process_time());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let plans = vec![chain_plan()];
        let orders_a = OrderGenerator::new(small_config(), 44)
            .generate(&plans)
            .unwrap();
        let orders_b = OrderGenerator::new(small_config(), 45)
            .generate(&plans)
            .unwrap();
        let same = orders_a
            .iter()
            .zip(&orders_b)
            .all(|(a, b)| a.arrival_time == b.arrival_time);
        assert!(!same);
    }

    #[test]
    fn arrivals_ascend_and_dues_trail_arrivals() {
        let plans = vec![chain_plan()];
        let orders = OrderGenerator::new(small_config(), 7)
            .generate(&plans)
            .unwrap();
        let mut last_arrival = 0.0;
        for order in &orders {
            assert!(order.arrival_time >= last_arrival);
            last_arrival = order.arrival_time;
            let slack = order.due_date - order.arrival_time;
            assert!((10.0..20.0).contains(&slack));
            assert!(order.priority <= 2);
        }
    }

    #[test]
    fn depth_pruning_caps_the_plan() {
        let plans = vec![chain_plan()];
        let mut config = small_config();
        config.max_plan_depth = 1;
        let orders = OrderGenerator::new(config, 7).generate(&plans).unwrap();
        for order in &orders {
            assert_eq!(order.flat_plan.len(), 1);
            assert_eq!(order.tasks[0].name, "T1");
        }
    }

    #[test]
    fn process_times_are_positive() {
        let plans = vec![chain_plan()];
        let orders = OrderGenerator::new(small_config(), 99)
            .generate(&plans)
            .unwrap();
        for order in &orders {
            for task in &order.tasks {
                assert!(task.process_time > 0.0);
            }
        }
    }
}
