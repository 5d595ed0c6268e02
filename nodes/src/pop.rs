/// Population type an entity was created with.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PopType {
    #[default]
    Unknown = 0,
    RandomPermanent = 1,
    RandomParked = 2,
    RandomPatrol = 3,
    RandomScenario = 4,
    RandomAmbient = 5,
    Permanent = 6,
    Mission = 7,
    Replay = 8,
    Cache = 9,
    Tool = 10,
}

impl PopType {
    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Unknown,
            1 => Self::RandomPermanent,
            2 => Self::RandomParked,
            3 => Self::RandomPatrol,
            4 => Self::RandomScenario,
            5 => Self::RandomAmbient,
            6 => Self::Permanent,
            7 => Self::Mission,
            8 => Self::Replay,
            9 => Self::Cache,
            10 => Self::Tool,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Permanent and mission entities count against the script budget.
    #[must_use]
    pub const fn is_script_owned(self) -> bool {
        matches!(self, Self::Permanent | Self::Mission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_match_wire() {
        for raw in 0..=10u8 {
            assert_eq!(PopType::from_raw(raw).map(PopType::raw), Some(raw));
        }
        assert_eq!(PopType::from_raw(11), None);
        assert_eq!(PopType::from_raw(15), None);
    }

    #[test]
    fn script_owned_types() {
        assert!(PopType::Mission.is_script_owned());
        assert!(PopType::Permanent.is_script_owned());
        assert!(!PopType::RandomAmbient.is_script_owned());
    }
}
