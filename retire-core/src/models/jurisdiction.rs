use std::fmt;

use serde::{Deserialize, Serialize};

/// Provincial or territorial tax region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Province {
    #[serde(rename = "AB")]
    Alberta,
    #[serde(rename = "BC")]
    BritishColumbia,
    #[serde(rename = "MB")]
    Manitoba,
    #[serde(rename = "NB")]
    NewBrunswick,
    #[serde(rename = "NL")]
    NewfoundlandAndLabrador,
    #[serde(rename = "NS")]
    NovaScotia,
    #[serde(rename = "NT")]
    NorthwestTerritories,
    #[serde(rename = "NU")]
    Nunavut,
    #[serde(rename = "ON")]
    Ontario,
    #[serde(rename = "PE")]
    PrinceEdwardIsland,
    #[serde(rename = "QC")]
    Quebec,
    #[serde(rename = "SK")]
    Saskatchewan,
    #[serde(rename = "YT")]
    Yukon,
}

impl Province {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alberta => "AB",
            Self::BritishColumbia => "BC",
            Self::Manitoba => "MB",
            Self::NewBrunswick => "NB",
            Self::NewfoundlandAndLabrador => "NL",
            Self::NovaScotia => "NS",
            Self::NorthwestTerritories => "NT",
            Self::Nunavut => "NU",
            Self::Ontario => "ON",
            Self::PrinceEdwardIsland => "PE",
            Self::Quebec => "QC",
            Self::Saskatchewan => "SK",
            Self::Yukon => "YT",
        }
    }

    /// Parses a two-letter code, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AB" => Some(Self::Alberta),
            "BC" => Some(Self::BritishColumbia),
            "MB" => Some(Self::Manitoba),
            "NB" => Some(Self::NewBrunswick),
            "NL" => Some(Self::NewfoundlandAndLabrador),
            "NS" => Some(Self::NovaScotia),
            "NT" => Some(Self::NorthwestTerritories),
            "NU" => Some(Self::Nunavut),
            "ON" => Some(Self::Ontario),
            "PE" => Some(Self::PrinceEdwardIsland),
            "QC" => Some(Self::Quebec),
            "SK" => Some(Self::Saskatchewan),
            "YT" => Some(Self::Yukon),
            _ => None,
        }
    }
}

impl fmt::Display for Province {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A taxing authority whose bracket table and credits are looked up
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Jurisdiction {
    Federal,
    Provincial(Province),
}

impl Jurisdiction {
    /// Code used in reference data files: `FED` or the province code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Federal => "FED",
            Self::Provincial(province) => province.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("FED") {
            return Some(Self::Federal);
        }
        Province::parse(s).map(Self::Provincial)
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.code())
    }
}
