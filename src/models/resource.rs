//! Resource kinds served by the catalog and the provenance marker.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Response header carrying the provenance tag.
pub const PROVENANCE_HEADER: &str = "x-content-source";

/// Collections exposed by the upstream catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    People,
    Planets,
    Films,
    Species,
    Vehicles,
    Starships,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        Self::People,
        Self::Planets,
        Self::Films,
        Self::Species,
        Self::Vehicles,
        Self::Starships,
    ];

    /// Collection path relative to the upstream API root.
    pub fn path(&self) -> &'static str {
        match self {
            Self::People => "people/",
            Self::Planets => "planets/",
            Self::Films => "films/",
            Self::Species => "species/",
            Self::Vehicles => "vehicles/",
            Self::Starships => "starships/",
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.path().trim_end_matches('/')
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_matches('/').to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| AppError::validation(format!("unknown resource kind '{s}'")))
    }
}

/// Where a collection response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provenance {
    /// Served from the record cache
    Cache,
    /// Required a remote crawl
    Call,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "CACHE",
            Self::Call => "CALL",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("people".parse::<ResourceKind>().unwrap(), ResourceKind::People);
        assert_eq!("/Films/".parse::<ResourceKind>().unwrap(), ResourceKind::Films);
        assert!("droids".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_provenance_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Provenance::Cache).unwrap(), "\"CACHE\"");
        assert_eq!(Provenance::Call.to_string(), "CALL");
    }
}
