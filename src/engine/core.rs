// 8.0 engine/core.rs: main engine. holds the pipeline stages and the collaborators.
// the engine itself is stateless between ticks, all state travels in SystemState.

use super::coordinator::OrderCoordinator;
use super::results::EngineError;
use crate::account::{Account, PassiveAccount};
use crate::config::StructureConfig;
use crate::order::{EntryKind, Order};
use crate::placement::PlacementPredicate;
use crate::reconcile::ZoneReconciler;
use crate::strategy::{Strategy, StrategyError, StrategyRegistry};
use crate::swing::SwingDetector;
use crate::state::SystemState;
use crate::zone::ZoneBuilder;
use std::fmt;

/** 8.1: main engine struct. pipeline stages in tick order */
pub struct Engine {
    pub(super) config: StructureConfig,
    pub(super) detector: SwingDetector,
    pub(super) builder: ZoneBuilder,
    pub(super) reconciler: ZoneReconciler,
    pub(super) coordinator: OrderCoordinator,
    pub(super) strategies: StrategyRegistry,
    pub(super) account: Box<dyn Account>,
}

impl Engine {
    /// Engine with the default placement predicates and no strategies.
    pub fn new(config: StructureConfig, account: impl Account + 'static) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            detector: SwingDetector::new(config.swing.clone()),
            builder: ZoneBuilder::new(),
            reconciler: ZoneReconciler::new(config.zones.clone()),
            coordinator: OrderCoordinator::with_default_predicates(&config.placement),
            strategies: StrategyRegistry::new(),
            account: Box::new(account),
            config,
        })
    }

    /// Zones only: a passive account and no strategies.
    pub fn structure_only(config: StructureConfig) -> Result<Self, EngineError> {
        Self::new(config, PassiveAccount)
    }

    /// Appends a strategy at the lowest priority.
    pub fn with_strategy(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.register(strategy);
        self
    }

    pub fn with_strategy_fn<F>(mut self, name: impl Into<String>, propose: F) -> Self
    where
        F: Fn(&SystemState) -> Result<Option<Order>, StrategyError> + Send + Sync + 'static,
    {
        self.strategies.register_fn(name, propose);
        self
    }

    /// Replaces the placement predicate for `kind`.
    pub fn with_predicate(mut self, kind: EntryKind, predicate: impl PlacementPredicate + 'static) -> Self {
        self.coordinator.register_predicate(kind, predicate);
        self
    }

    /// Drops the placement predicate for `kind`, making it always ready.
    pub fn without_predicate(mut self, kind: EntryKind) -> Self {
        self.coordinator.unregister_predicate(kind);
        self
    }

    pub fn config(&self) -> &StructureConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &OrderCoordinator {
        &self.coordinator
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub fn reconciler(&self) -> &ZoneReconciler {
        &self.reconciler
    }

    pub fn detector(&self) -> &SwingDetector {
        &self.detector
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("coordinator", &self.coordinator)
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}
