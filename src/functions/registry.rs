use std::collections::HashMap;

use super::library;
use super::strategy::StrategyDescriptor;
use crate::error::{Result, StockfilterError};

/// Strategy name -> descriptor prototype.
pub struct StrategyRegistry {
    strategies: HashMap<String, StrategyDescriptor>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyRegistry {
    pub fn new() -> Self {
        let mut registry = Self { strategies: HashMap::new() };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        self.register(library::ema_cross_close());
        self.register(library::sma_cross_close());
        self.register(library::sma_cross_sma());
        self.register(library::rsi());
    }

    pub fn register(&mut self, strategy: StrategyDescriptor) {
        self.strategies.insert(strategy.name().to_string(), strategy);
    }

    /// Fresh copy of the named prototype.
    pub fn get(&self, name: &str) -> Result<StrategyDescriptor> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| StockfilterError::NotFound(format!("Unknown strategy {}", name)))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
