//! Shared data-model entities (§3): the small plain structs threaded
//! between the protocol client, the fetch planner, and the update
//! applier. Kept free of any particular storage backend so that C6–C8
//! can be tested against an in-memory [`crate::adapters`] implementation.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub type Revision = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Dir,
    None,
}

impl NodeKind {
    pub fn as_atom(self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Dir => "dir",
            NodeKind::None => "none",
        }
    }

    pub fn from_atom(atom: &str) -> Option<Self> {
        match atom {
            "file" => Some(NodeKind::File),
            "dir" => Some(NodeKind::Dir),
            "none" => Some(NodeKind::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Modify,
    Delete,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    pub path: String,
    pub kind: ChangeKind,
    pub node_kind: NodeKind,
    pub copy_source: Option<(String, Revision)>,
}

/// one server commit as returned by C3's `log` operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub rev: Revision,
    pub author: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub changed_paths: Vec<ChangedPath>,
    /// `(path, rev)` this branch was copied from, if this is the branch's
    /// first revision and it originated from a copy
    pub copy_source: Option<(String, Revision)>,
    /// true when the copying revision *also* modified files under the
    /// copy's own subtree, which disables the fast copy-only path
    pub copy_modified: bool,
}

impl LogEntry {
    pub fn invariants_hold(&self) -> bool {
        self.copy_source.as_ref().map_or(true, |(_, copy_rev)| *copy_rev <= self.rev)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RevisionRange {
    pub from: Revision,
    pub to: Revision,
}

impl RevisionRange {
    pub fn new(from: Revision, to: Revision) -> Self {
        debug_assert!(from <= to);
        Self { from, to }
    }

    pub fn single(rev: Revision) -> Self {
        Self { from: rev, to: rev }
    }

    /// adjacent or overlapping: `[a,b]` and `[b+1,c]` (or anything
    /// closer) merge into one coalesced range
    fn touches(&self, other: &RevisionRange) -> bool {
        self.from <= other.to.saturating_add(1) && other.from <= self.to.saturating_add(1)
    }

    fn union(&self, other: &RevisionRange) -> RevisionRange {
        RevisionRange { from: self.from.min(other.from), to: self.to.max(other.to) }
    }
}

/// a set of `(path, revision-range)` records, normalised so that within
/// each path the ranges are disjoint, sorted, and maximally coalesced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mergeinfo {
    pub paths: BTreeMap<String, Vec<RevisionRange>>,
}

impl Mergeinfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, range: RevisionRange) {
        let ranges = self.paths.entry(path.into()).or_default();
        ranges.push(range);
        Self::normalize_ranges(ranges);
    }

    fn normalize_ranges(ranges: &mut Vec<RevisionRange>) {
        ranges.sort();
        let mut coalesced: Vec<RevisionRange> = Vec::with_capacity(ranges.len());
        for r in ranges.drain(..) {
            match coalesced.last_mut() {
                Some(last) if last.touches(&r) => *last = last.union(&r),
                _ => coalesced.push(r),
            }
        }
        *ranges = coalesced;
    }

    /// `merge(a, b, mask)`: insert each range from `b` into `self`, first
    /// subtracting any revision covered by `mask`
    pub fn merge(&mut self, other: &Mergeinfo, mask: &Mergeinfo) {
        for (path, ranges) in &other.paths {
            let masked = mask.paths.get(path);
            for range in ranges {
                for rev in range.from..=range.to {
                    if masked.map_or(false, |m| m.iter().any(|r| r.from <= rev && rev <= r.to)) {
                        continue;
                    }
                    self.insert(path.clone(), RevisionRange::single(rev));
                }
            }
        }
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (path, ranges) in &self.paths {
            if ranges.is_empty() {
                continue;
            }
            out.push_str(path);
            out.push(':');
            let items: Vec<String> = ranges
                .iter()
                .map(|r| if r.from == r.to {
                    r.from.to_string()
                } else {
                    format!("{}-{}", r.from, r.to)
                })
                .collect();
            out.push_str(&items.join(","));
            out.push('\n');
        }
        out
    }

    pub fn parse(s: &str) -> crate::error::GsvnResult<Self> {
        let mut info = Mergeinfo::new();
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (path, ranges) = line.split_once(':').ok_or_else(|| {
                crate::error::GsvnError::protocol(format!("malformed mergeinfo line `{}`", line))
            })?;
            for item in ranges.split(',') {
                let item = item.trim();
                if item.is_empty() {
                    continue;
                }
                let range = match item.split_once('-') {
                    Some((from, to)) => RevisionRange::new(
                        from.parse().map_err(|_| crate::error::GsvnError::protocol("bad mergeinfo range"))?,
                        to.parse().map_err(|_| crate::error::GsvnError::protocol("bad mergeinfo range"))?,
                    ),
                    None => RevisionRange::single(
                        item.parse().map_err(|_| crate::error::GsvnError::protocol("bad mergeinfo rev"))?,
                    ),
                };
                info.insert(path.to_string(), range);
            }
        }
        Ok(info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub rev: Revision,
    pub date: DateTime<Utc>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Credential {
    pub username: Option<String>,
    pub password: Option<String>,
}
