use core_types::OpenPosition;
use dashmap::DashMap;

/// Open positions, at most one per symbol.
///
/// Filled by whatever executes entries; read on every fast bar to decide
/// whether the trailing exit or the entry rules apply.
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: DashMap<String, OpenPosition>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a position, returning the one it replaced, if any.
    pub fn open(&self, position: OpenPosition) -> Option<OpenPosition> {
        self.positions.insert(position.symbol.clone(), position)
    }

    pub fn close(&self, symbol: &str) -> Option<OpenPosition> {
        self.positions.remove(symbol).map(|(_, position)| position)
    }

    pub fn get(&self, symbol: &str) -> Option<OpenPosition> {
        self.positions.get(symbol).map(|entry| entry.value().clone())
    }

    pub fn is_open(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
