//! Engine configuration.

use schema::GameBuild;

/// How an accepted leaf parse decides whether content changed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangePolicy {
    /// Every accepted parse is a change: version bumps and all acks clear.
    #[default]
    Always,
    /// Only a parse whose captured bits differ from the stored payload is a
    /// change.
    PayloadDiff,
}

/// Configuration shared by every tree an engine builds.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Game build used to gate build-dependent fields in content decoders.
    pub game_build: GameBuild,
    /// Change detection for inbound leaves.
    pub change_policy: ChangePolicy,
}

impl EngineConfig {
    #[must_use]
    pub const fn new(game_build: GameBuild) -> Self {
        Self {
            game_build,
            change_policy: ChangePolicy::Always,
        }
    }

    /// Configuration used by tests: the newest build so every gated field is
    /// exercised.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self::new(GameBuild(2545))
    }

    #[must_use]
    pub const fn with_change_policy(mut self, change_policy: ChangePolicy) -> Self {
        self.change_policy = change_policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reproduces_unconditional_change() {
        let config = EngineConfig::default();
        assert_eq!(config.change_policy, ChangePolicy::Always);
        assert_eq!(config.game_build, GameBuild::BASELINE);
    }

    #[test]
    fn testing_config_enables_gated_fields() {
        let config = EngineConfig::for_testing();
        assert!(config.game_build.at_least(2060));
        assert!(config.game_build.at_least(2545));
    }

    #[test]
    fn builder_sets_policy() {
        let config = EngineConfig::default().with_change_policy(ChangePolicy::PayloadDiff);
        assert_eq!(config.change_policy, ChangePolicy::PayloadDiff);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "change_policy": "payload_diff" }"#).unwrap();
        assert_eq!(config.change_policy, ChangePolicy::PayloadDiff);
        assert_eq!(config.game_build, GameBuild::BASELINE);
    }
}
