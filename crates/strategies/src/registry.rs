use crate::error::StrategyError;
use crate::vegas_tunnel::VegasTunnel;
use configuration::Strategies;
use std::collections::HashMap;
use std::sync::Arc;

/// Named, validated strategy instances shared by the engine's bots.
///
/// Instances are stateless, so a single `Arc` serves every symbol bound to a name.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<VegasTunnel>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry holding every strategy that has a parameter section,
    /// registered under its canonical name.
    pub fn from_config(strategies: &Strategies) -> Result<Self, StrategyError> {
        let mut registry = Self::new();
        registry.register(
            VegasTunnel::NAME,
            VegasTunnel::new(strategies.vegas_tunnel.clone())?,
        )?;
        Ok(registry)
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        strategy: VegasTunnel,
    ) -> Result<Arc<VegasTunnel>, StrategyError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StrategyError::InvalidParameters(
                "strategy name cannot be empty".to_string(),
            ));
        }
        if self.strategies.contains_key(&name) {
            return Err(StrategyError::AlreadyRegistered(name));
        }
        let strategy = Arc::new(strategy);
        tracing::info!(%name, "Strategy registered");
        self.strategies.insert(name, Arc::clone(&strategy));
        Ok(strategy)
    }

    pub fn unregister(&mut self, name: &str) -> Result<Arc<VegasTunnel>, StrategyError> {
        self.strategies
            .remove(name)
            .ok_or_else(|| StrategyError::StrategyNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<Arc<VegasTunnel>, StrategyError> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| StrategyError::StrategyNotFound(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
