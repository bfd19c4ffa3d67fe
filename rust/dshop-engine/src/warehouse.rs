//! Output warehouse for disassembled components

/// The sole output warehouse; components are deposited on task completion
#[derive(Debug, Clone)]
pub struct Warehouse {
    /// Warehouse identifier
    pub id: String,
    /// Deposited components, in deposit order
    pub stock: Vec<String>,
}

impl Warehouse {
    /// Create an empty warehouse
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            stock: Vec::new(),
        }
    }

    /// Deposit a produced component
    pub fn add_item(&mut self, component: String) {
        self.stock.push(component);
    }
}
