// 8.4 engine/desk.rs: one engine, many contracts.
// each contract keeps its own SystemState. nothing crosses between them, so the
// single-active-order rule holds per contract.

use super::core::Engine;
use super::results::EngineError;
use crate::candle::Candle;
use crate::events::EventEmitter;
use crate::state::SystemState;
use crate::types::ContractId;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug)]
pub struct Desk {
    engine: Engine,
    states: HashMap<ContractId, SystemState>,
}

impl Desk {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            states: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Starts tracking `contract` with empty state. Returns false if it was
    /// already tracked, in which case its state is kept.
    pub fn open_contract(&mut self, contract: ContractId) -> bool {
        if self.states.contains_key(&contract) {
            return false;
        }
        info!("Tracking contract {}", contract);
        self.states.insert(contract.clone(), SystemState::new(contract));
        true
    }

    /// Stops tracking `contract` and hands back its final state.
    pub fn close_contract(&mut self, contract: &ContractId) -> Option<SystemState> {
        self.states.remove(contract)
    }

    pub fn state(&self, contract: &ContractId) -> Option<&SystemState> {
        self.states.get(contract)
    }

    pub fn contracts(&self) -> impl Iterator<Item = &ContractId> {
        self.states.keys()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Routes `candle` to the state of `contract`. On error that state is
    /// left as it was and other contracts are unaffected.
    pub fn apply(
        &mut self,
        contract: &ContractId,
        candle: Candle,
        sink: &mut impl EventEmitter,
    ) -> Result<usize, EngineError> {
        let state = self
            .states
            .get_mut(contract)
            .ok_or_else(|| EngineError::UnknownContract(contract.clone()))?;
        self.engine.run_tick(state, candle, sink)
    }
}
