//! Shared fixtures for the scenario suites
//!
//! The six-order fixture mirrors the hand-crafted shop used throughout the
//! acceptance tests: two plan variants over stations A-E.

#![allow(dead_code)]

use dshop_config::SimulationConfig;
use dshop_engine::{Order, PlanNode};
use std::collections::BTreeMap;

/// Plan 1: T1(A,3) -> [T2(B,2) -> T4(D,3) -> T5(E,4), T3(C,2)]
pub fn plan1() -> Vec<PlanNode> {
    vec![PlanNode::new("T1", 3.0, "A")
        .with_revenue(30.0)
        .with_child(
            PlanNode::new("T2", 2.0, "B").with_revenue(10.0).with_child(
                PlanNode::new("T4", 3.0, "D")
                    .with_revenue(20.0)
                    .with_child(PlanNode::new("T5", 4.0, "E").with_revenue(25.0)),
            ),
        )
        .with_child(PlanNode::new("T3", 2.0, "C").with_revenue(15.0))]
}

/// Plan 2: T4(D,2) -> T1(A,2) -> [T2(B,3) -> T5(E,4), T3(C,3)]
pub fn plan2() -> Vec<PlanNode> {
    vec![PlanNode::new("T4", 2.0, "D")
        .with_revenue(20.0)
        .with_child(
            PlanNode::new("T1", 2.0, "A")
                .with_revenue(30.0)
                .with_child(
                    PlanNode::new("T2", 3.0, "B")
                        .with_revenue(10.0)
                        .with_child(PlanNode::new("T5", 4.0, "E").with_revenue(25.0)),
                )
                .with_child(PlanNode::new("T3", 3.0, "C").with_revenue(15.0)),
        )]
}

/// The six-order fixture: two plan variants, arrivals 1,1,2,2,3,3
pub fn fixture_orders() -> Vec<Order> {
    vec![
        Order::new("O-1", 2, 1.0, 15.0, "Plan1", plan1()).unwrap(),
        Order::new("O-2", 2, 1.0, 25.0, "Plan2", plan2()).unwrap(),
        Order::new("O-3", 2, 2.0, 30.0, "Plan2", plan2()).unwrap(),
        Order::new("O-4", 2, 2.0, 25.0, "Plan1", plan1()).unwrap(),
        Order::new("O-5", 2, 3.0, 20.0, "Plan1", plan1()).unwrap(),
        Order::new("O-6", 2, 3.0, 30.0, "Plan2", plan2()).unwrap(),
    ]
}

/// A shop with one station instance per type
pub fn single_instance_config(types: &[&str]) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.station_types = types.iter().map(|t| t.to_string()).collect();
    config.station_instances = types
        .iter()
        .map(|t| (t.to_string(), 1))
        .collect::<BTreeMap<_, _>>();
    config
}

/// A single-task order on one station type
pub fn one_task_order(
    id: &str,
    priority: u8,
    arrival: f64,
    due: f64,
    station: &str,
    process_time: f64,
) -> Order {
    Order::new(
        id,
        priority,
        arrival,
        due,
        "Single",
        vec![PlanNode::new("T1", process_time, station)],
    )
    .unwrap()
}
