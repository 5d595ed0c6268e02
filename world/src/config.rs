//! World configuration.

use engine::EngineConfig;

use crate::entity::EntityOrphanMode;

/// Default number of script handles the pool can hand out.
pub const DEFAULT_SCRIPT_HANDLE_CAPACITY: usize = 16_384;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldConfig {
    /// Configuration for every entity's sync tree.
    pub engine: EngineConfig,
    /// Orphan mode new entities start with.
    pub default_orphan_mode: EntityOrphanMode,
    pub script_handle_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            default_orphan_mode: EntityOrphanMode::DeleteWhenNotRelevant,
            script_handle_capacity: DEFAULT_SCRIPT_HANDLE_CAPACITY,
        }
    }
}

impl WorldConfig {
    /// Configuration used by tests: newest build, small handle pool.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            engine: EngineConfig::for_testing(),
            script_handle_capacity: 64,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_orphan_mode(mut self, mode: EntityOrphanMode) -> Self {
        self.default_orphan_mode = mode;
        self
    }
}
