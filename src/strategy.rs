//! Strategy registry.
//!
//! Strategies look at the state after this tick's zones are reconciled and may
//! propose one candidate order. The engine polls them in registration order and
//! admits the first candidate that finds the active slot empty.

use crate::order::Order;
use crate::state::SystemState;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("Strategy {strategy} failed: {reason}")]
    Failed { strategy: String, reason: String },

    #[error("Strategy input unavailable: {0}")]
    MissingInput(String),
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn propose(&self, state: &SystemState) -> Result<Option<Order>, StrategyError>;
}

/// Adapter for closure strategies.
pub struct FnStrategy<F> {
    name: String,
    propose: F,
}

impl<F> FnStrategy<F>
where
    F: Fn(&SystemState) -> Result<Option<Order>, StrategyError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, propose: F) -> Self {
        Self {
            name: name.into(),
            propose,
        }
    }
}

impl<F> Strategy for FnStrategy<F>
where
    F: Fn(&SystemState) -> Result<Option<Order>, StrategyError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(&self, state: &SystemState) -> Result<Option<Order>, StrategyError> {
        (self.propose)(state)
    }
}

/// Strategies in fixed priority order, highest first.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `strategy` at the lowest priority.
    pub fn register(&mut self, strategy: impl Strategy + 'static) {
        self.strategies.push(Box::new(strategy));
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, propose: F)
    where
        F: Fn(&SystemState) -> Result<Option<Order>, StrategyError> + Send + Sync + 'static,
    {
        self.register(FnStrategy::new(name, propose));
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Strategy> {
        self.strategies.iter().map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry").field("strategies", &self.names()).finish()
    }
}
