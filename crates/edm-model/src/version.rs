//! EDM version tags

use crate::ContractError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// CSDL version a model conforms to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum EdmVersion {
    /// CSDL 4.0
    V4,
    /// CSDL 4.01
    #[default]
    V401,
}

impl EdmVersion {
    /// The most recent supported version
    pub const LATEST: Self = Self::V401;

    /// Every supported version, oldest first
    pub const ALL: [Self; 2] = [Self::V4, Self::V401];

    /// Version number as written in the `Version` attribute
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V4 => "4.0",
            Self::V401 => "4.01",
        }
    }
}

impl fmt::Display for EdmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdmVersion {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4.0" => Ok(Self::V4),
            "4.01" => Ok(Self::V401),
            other => Err(ContractError::UnsupportedVersion(other.to_string())),
        }
    }
}
