//! Memory structure

pub mod address;
pub mod cache;
pub mod hierarchy;
pub mod measurements;
pub mod replacement;

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    Read,
    Write,
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" | "R" => Ok(AccessType::Read),
            "w" | "W" => Ok(AccessType::Write),
            _ => Err(format!(
                "Invalid operation '{}': expected 'r' or 'w'",
                s
            )),
        }
    }
}

/// Result of one access to one level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    /// Miss filled into an empty way
    MissInsert,
    /// Miss that replaced a resident block
    MissEvict,
}

/// Whether a lower level must hold everything the level above holds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InclusionPolicy {
    #[default]
    NonInclusive,
    Inclusive,
}

impl FromStr for InclusionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0" | "non-inclusive" => Ok(InclusionPolicy::NonInclusive),
            "1" | "inclusive" => Ok(InclusionPolicy::Inclusive),
            _ => Err(format!(
                "Invalid inclusion property: '{}'. Expected 0 (non-inclusive) or 1 (inclusive).",
                s
            )),
        }
    }
}

impl fmt::Display for InclusionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InclusionPolicy::NonInclusive => "non-inclusive",
            InclusionPolicy::Inclusive => "inclusive",
        })
    }
}

/// One access of a trace
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceEntry {
    pub access_type: AccessType,
    pub address: u32,
}

impl TraceEntry {
    pub fn new(access_type: AccessType, address: u32) -> Self {
        Self { access_type, address }
    }

    pub fn read(address: u32) -> Self {
        Self::new(AccessType::Read, address)
    }

    pub fn write(address: u32) -> Self {
        Self::new(AccessType::Write, address)
    }
}
