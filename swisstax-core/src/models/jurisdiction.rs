use std::fmt;

use serde::{Deserialize, Serialize};

/// The 26 Swiss cantons, identified by their official two-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CantonCode {
    AG,
    AI,
    AR,
    BE,
    BL,
    BS,
    FR,
    GE,
    GL,
    GR,
    JU,
    LU,
    NE,
    NW,
    OW,
    SG,
    SH,
    SO,
    SZ,
    TG,
    TI,
    UR,
    VD,
    VS,
    ZG,
    ZH,
}

impl CantonCode {
    pub const ALL: [CantonCode; 26] = [
        Self::AG,
        Self::AI,
        Self::AR,
        Self::BE,
        Self::BL,
        Self::BS,
        Self::FR,
        Self::GE,
        Self::GL,
        Self::GR,
        Self::JU,
        Self::LU,
        Self::NE,
        Self::NW,
        Self::OW,
        Self::SG,
        Self::SH,
        Self::SO,
        Self::SZ,
        Self::TG,
        Self::TI,
        Self::UR,
        Self::VD,
        Self::VS,
        Self::ZG,
        Self::ZH,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AG => "AG",
            Self::AI => "AI",
            Self::AR => "AR",
            Self::BE => "BE",
            Self::BL => "BL",
            Self::BS => "BS",
            Self::FR => "FR",
            Self::GE => "GE",
            Self::GL => "GL",
            Self::GR => "GR",
            Self::JU => "JU",
            Self::LU => "LU",
            Self::NE => "NE",
            Self::NW => "NW",
            Self::OW => "OW",
            Self::SG => "SG",
            Self::SH => "SH",
            Self::SO => "SO",
            Self::SZ => "SZ",
            Self::TG => "TG",
            Self::TI => "TI",
            Self::UR => "UR",
            Self::VD => "VD",
            Self::VS => "VS",
            Self::ZG => "ZG",
            Self::ZH => "ZH",
        }
    }

    /// Case-insensitive parse of a two-letter canton code.
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|c| c.as_str() == upper)
    }
}

impl fmt::Display for CantonCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of a tax schedule: the federal government or one canton.
///
/// The federal schedule is stored alongside the cantonal ones as a
/// pseudo-canton with the code `CH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    Federal,
    Canton(CantonCode),
}

impl Jurisdiction {
    pub const FEDERAL_CODE: &'static str = "CH";

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Federal => Self::FEDERAL_CODE,
            Self::Canton(code) => code.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case(Self::FEDERAL_CODE) {
            return Some(Self::Federal);
        }
        CantonCode::parse(s).map(Self::Canton)
    }

    pub fn canton(&self) -> Option<CantonCode> {
        match self {
            Self::Federal => None,
            Self::Canton(code) => Some(*code),
        }
    }
}

impl From<CantonCode> for Jurisdiction {
    fn from(code: CantonCode) -> Self {
        Self::Canton(code)
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn every_canton_round_trips_through_its_code() {
        for canton in CantonCode::ALL {
            assert_eq!(CantonCode::parse(canton.as_str()), Some(canton));
        }
    }

    #[test]
    fn canton_parse_is_case_insensitive() {
        assert_eq!(CantonCode::parse("bs"), Some(CantonCode::BS));
        assert_eq!(CantonCode::parse(" zh "), Some(CantonCode::ZH));
    }

    #[test]
    fn unknown_canton_code_is_rejected() {
        assert_eq!(CantonCode::parse("ZZ"), None);
        assert_eq!(CantonCode::parse(""), None);
    }

    #[test]
    fn federal_uses_ch_pseudo_code() {
        assert_eq!(Jurisdiction::parse("CH"), Some(Jurisdiction::Federal));
        assert_eq!(Jurisdiction::Federal.to_string(), "CH");
        assert_eq!(Jurisdiction::Federal.canton(), None);
    }

    #[test]
    fn canton_jurisdiction_displays_canton_code() {
        let j = Jurisdiction::from(CantonCode::GE);

        assert_eq!(j.to_string(), "GE");
        assert_eq!(j.canton(), Some(CantonCode::GE));
    }
}
