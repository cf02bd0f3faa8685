use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CivilStatus {
    Single,
    Married,
    /// Unmarried taxpayer living with dependent children.
    SingleParent,
}

impl CivilStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Married => "married",
            Self::SingleParent => "single_parent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "married" => Some(Self::Married),
            "single_parent" => Some(Self::SingleParent),
            _ => None,
        }
    }

    /// The tariff a taxpayer with this status is assessed under.
    ///
    /// Single parents are assessed under the married tariff.
    pub fn tariff(&self) -> TariffGroup {
        match self {
            Self::Single => TariffGroup::Single,
            Self::Married | Self::SingleParent => TariffGroup::Married,
        }
    }
}

/// Bracket table variant. Most schedules publish one table for single
/// taxpayers and one for married couples and single parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TariffGroup {
    Single,
    Married,
}

impl TariffGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Married => "married",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "married" => Some(Self::Married),
            _ => None,
        }
    }
}
