//! Position Store
//!
//! Authoritative owner of the open position set. Market ticks and greeks
//! updates are merged here and nowhere else; readers take stable
//! insertion-ordered snapshots that are safe to walk while a cycle writes.

use crate::error::{EngineError, Result};
use crate::types::{GreeksDelta, MarketTick, Position};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::RwLock;
use tracing::debug;

/// Thread-safe store of open positions.
pub struct PositionStore {
    positions: DashMap<String, Position>,
    /// Insertion order of position ids; removals preserve relative order.
    order: RwLock<Vec<String>>,
}

impl PositionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            positions: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Insert or replace a position. New ids append to the snapshot order.
    pub fn open(&self, position: Position) {
        let id = position.id.clone();
        let is_new = self.positions.insert(id.clone(), position).is_none();
        if is_new {
            self.order.write().unwrap().push(id);
        }
    }

    /// Remove a closed position.
    pub fn close(&self, id: &str) -> Result<Position> {
        let (_, position) = self
            .positions
            .remove(id)
            .ok_or_else(|| EngineError::NotFound(format!("position {id}")))?;
        self.order.write().unwrap().retain(|p| p != id);
        Ok(position)
    }

    /// Look up a position by id.
    pub fn get(&self, id: &str) -> Option<Position> {
        self.positions.get(id).map(|p| p.value().clone())
    }

    /// Re-mark one position and refresh its unrealized PnL.
    pub fn apply_tick(&self, id: &str, price: f64, at: DateTime<Utc>) -> Result<()> {
        let mut position = self
            .positions
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("position {id}")))?;
        position.mark(price, at);
        Ok(())
    }

    /// Apply a market tick to every position in the tick's asset.
    ///
    /// Returns the number of positions updated; zero is not an error (a tick
    /// for an asset with no open book is simply dropped).
    pub fn apply_market_tick(&self, tick: &MarketTick) -> usize {
        let mut updated = 0;
        for mut entry in self.positions.iter_mut() {
            if entry.asset == tick.asset {
                entry.mark(tick.price, tick.timestamp);
                updated += 1;
            }
        }
        if updated == 0 {
            debug!("tick for {} matched no open position", tick.asset);
        }
        updated
    }

    /// Nudge one position's greeks, clamping delta to [0, 1] and flooring
    /// gamma and vega at zero.
    pub fn apply_greeks_update(&self, id: &str, delta: &GreeksDelta) -> Result<()> {
        let mut position = self
            .positions
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("position {id}")))?;
        position.greeks.apply(delta);
        Ok(())
    }

    /// Immutable snapshot of all positions in stable insertion order.
    pub fn snapshot(&self) -> Vec<Position> {
        let order = self.order.read().unwrap();
        order
            .iter()
            .filter_map(|id| self.positions.get(id).map(|p| p.value().clone()))
            .collect()
    }

    /// Positions for a single asset, in insertion order.
    pub fn positions_for_asset(&self, asset: &str) -> Vec<Position> {
        self.snapshot()
            .into_iter()
            .filter(|p| p.asset == asset)
            .collect()
    }

    /// Number of open positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Greeks;

    fn position(id: &str, asset: &str) -> Position {
        Position::new(id, asset, 2.0, 100.0, Greeks::new(0.5, 0.02, -10.0, 50.0))
    }

    #[test]
    fn test_snapshot_preserves_insertion_order() {
        let store = PositionStore::new();
        store.open(position("c", "BTC"));
        store.open(position("a", "ETH"));
        store.open(position("b", "SOL"));

        let ids: Vec<String> = store.snapshot().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        store.close("a").unwrap();
        let ids: Vec<String> = store.snapshot().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_apply_tick_reprices_and_updates_pnl() {
        let store = PositionStore::new();
        store.open(position("p1", "BTC"));

        store.apply_tick("p1", 110.0, Utc::now()).unwrap();
        let p = store.get("p1").unwrap();
        assert_eq!(p.current_price, 110.0);
        assert_eq!(p.unrealized_pnl, 20.0);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let store = PositionStore::new();
        let err = store.apply_tick("missing", 1.0, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[test]
    fn test_greeks_clamped() {
        let store = PositionStore::new();
        store.open(position("p1", "BTC"));

        let update = GreeksDelta { delta: 0.9, gamma: -1.0, theta: -2.0, vega: -500.0 };
        store.apply_greeks_update("p1", &update).unwrap();

        let p = store.get("p1").unwrap();
        assert_eq!(p.greeks.delta, 1.0);
        assert_eq!(p.greeks.gamma, 0.0);
        assert_eq!(p.greeks.vega, 0.0);
        assert_eq!(p.greeks.theta, -12.0);
    }
}
