//! Per-turn capabilities and item usage counters

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ItemId;

/// Rule exceptions a hero can hold for the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnCapability {
    /// Movement may continue after the action even if some was spent before it
    SplitMovement,
    /// A second main action this turn
    ExtraAction,
}

/// How many times each item was used this turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUsage {
    counts: HashMap<ItemId, u32>,
}

impl ItemUsage {
    pub fn count(&self, item: &ItemId) -> u32 {
        self.counts.get(item).copied().unwrap_or(0)
    }

    /// Records one use, refusing once `limit` uses were recorded
    pub fn try_record(&mut self, item: &ItemId, limit: u32) -> bool {
        let count = self.counts.entry(item.clone()).or_insert(0);
        if *count >= limit {
            return false;
        }
        *count += 1;
        true
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_usage_respects_limit() {
        let mut usage = ItemUsage::default();
        let potion = ItemId::new("potion-of-healing");
        assert!(usage.try_record(&potion, 1));
        assert!(!usage.try_record(&potion, 1));
        assert_eq!(usage.count(&potion), 1);

        usage.clear();
        assert_eq!(usage.count(&potion), 0);
    }
}
