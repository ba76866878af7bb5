//! Configuration (§6, §4.12): typed accessors over an already-parsed
//! `section.key` (or `section.subsection.key`) map. Grounded on
//! `libbit::config`'s `Config` wrapper providing convenient typed getters
//! over settings (`repo.config().filemode()` and friends) — simplified
//! here since parsing a real `.gitconfig`-shaped file is an external
//! collaborator's job, not this crate's; `Config` only interprets an
//! already-built map.

use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eol {
    Lf,
    Crlf,
    Native,
    Unset,
}

impl FromStr for Eol {
    type Err = crate::error::GsvnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lf" => Ok(Eol::Lf),
            "crlf" => Ok(Eol::Crlf),
            "native" => Ok(Eol::Native),
            "unset" => Ok(Eol::Unset),
            other => Err(crate::error::GsvnError::protocol(format!("invalid svn.eol value `{}`", other))),
        }
    }
}

/// a typed view over a flat `section.key` map, as produced by parsing a
/// `.gitconfig`-shaped file plus environment overrides
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn eol(&self) -> Eol {
        self.raw("svn.eol").and_then(|v| v.parse().ok()).unwrap_or(Eol::Unset)
    }

    pub fn empty_message(&self) -> Option<&str> {
        self.raw("svn.emptymsg")
    }

    pub fn gc_period(&self) -> Option<u64> {
        self.raw("svn.gcperiod").and_then(|v| v.parse().ok())
    }

    pub fn authors_path(&self) -> Option<&str> {
        self.raw("svn.authors")
    }

    pub fn remote_max_rev(&self, remote: &str) -> Option<u64> {
        self.raw(&format!("remote.{}.maxrev", remote)).and_then(|v| v.parse().ok())
    }

    /// `remote.<name>.map` may repeat; collect every occurrence via
    /// `section.map.0`, `section.map.1`, ... since this flat map can't
    /// itself hold multiple values under one key
    pub fn remote_maps(&self, remote: &str) -> Vec<&str> {
        let prefix = format!("remote.{}.map.", remote);
        let mut entries: Vec<(&str, &str)> = self
            .values
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|suffix| (suffix, v.as_str())))
            .collect();
        entries.sort_by_key(|(suffix, _)| suffix.parse::<u32>().unwrap_or(u32::MAX));
        entries.into_iter().map(|(_, v)| v).collect()
    }

    pub fn remote_excludes(&self, remote: &str) -> Vec<&str> {
        let prefix = format!("remote.{}.exclude.", remote);
        let mut entries: Vec<(&str, &str)> = self
            .values
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|suffix| (suffix, v.as_str())))
            .collect();
        entries.sort_by_key(|(suffix, _)| suffix.parse::<u32>().unwrap_or(u32::MAX));
        entries.into_iter().map(|(_, v)| v).collect()
    }
}
