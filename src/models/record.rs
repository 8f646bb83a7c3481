use serde::{Deserialize, Serialize};

/// A birthday row as scraped from the remote table, before any cleanup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRecord {
    /// Name as displayed by the site ("Surnames GivenNames", upper case).
    pub name: String,
    /// Day and month, `DD/MM`.
    pub birthday: String,
    pub phone: String,
    pub age: String,
}

/// A cleaned birthday entry, as served in the download payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedRecord {
    /// "GivenNames Surnames" in title case.
    pub full_name: String,
    /// ISO date `YYYY-MM-DD` in the year of execution.
    pub birthday: String,
    pub phone: String,
    pub age: Option<u32>,
}
