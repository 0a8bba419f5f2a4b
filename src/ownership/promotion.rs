//! Environment promotion order

use serde::Serialize;

/// A tenant's ordered environment chain for one cluster kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromotionOrder {
    envs: Vec<String>,
}

impl PromotionOrder {
    /// Parse a comma separated list such as "1,2,3"; blanks are skipped
    pub fn parse(order: &str) -> Self {
        Self {
            envs: order
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    pub fn contains(&self, env_id: &str) -> bool {
        self.envs.iter().any(|e| e == env_id)
    }
}
