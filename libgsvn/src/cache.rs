//! Revision cache (C5): persists one [`RevisionRecord`] per revision of a
//! branch, referenced under the deterministic ref names spec.md §6
//! describes, and answers `(branch, rev) -> record` by walking the parent
//! chain. Grounded on this crate's own prior shape (an in-memory cache
//! keyed by id sitting in front of a backing store) generalised from git
//! object ids to svn revisions.

use crate::adapters::{Commit, ObjectStore, Oid, RefStore, RevisionRecord};
use crate::error::{GsvnError, GsvnResult};
use crate::model::Revision;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

fn ref_name(uuid: &str, path: &str, start: Revision) -> String {
    let escaped: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '/' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("refs/svn/{}/{}.{}", uuid, escaped.trim_start_matches('/'), start)
}

fn log_ref_name(uuid: &str, path: &str, start: Revision) -> String {
    format!("{}.log", ref_name(uuid, path, start))
}

/// an in-memory front for records already loaded this run, keyed by
/// `(branch path, branch start)` so that lookups within a branch slice
/// don't re-walk the object store's parent chain on every call.
#[derive(Default)]
pub struct RevisionCache {
    loaded: HashMap<(String, Revision), Vec<RevisionRecord>>,
}

impl RevisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// records known in-memory for one branch slice, newest first
    pub fn records_for(&self, path: &str, start: Revision) -> &[RevisionRecord] {
        self.loaded.get(&(path.to_string(), start)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(branch, rev) -> record`: the newest cached record whose own
    /// revision is `<= rev`, per §4.5
    pub fn lookup(&self, path: &str, start: Revision, rev: Revision) -> Option<&RevisionRecord> {
        self.records_for(path, start).iter().find(|r| r.rev <= rev)
    }

    /// loads every record reachable from the branch's head ref by walking
    /// `parent` links, most-recent first; a no-op if already loaded
    pub async fn load(
        &mut self,
        refs: &dyn RefStore,
        store: &dyn ObjectStore,
        uuid: &str,
        path: &str,
        start: Revision,
    ) -> GsvnResult<()> {
        let key = (path.to_string(), start);
        if self.loaded.contains_key(&key) {
            return Ok(());
        }

        let mut records = Vec::new();
        let head = refs.read(&ref_name(uuid, path, start)).await?;
        let mut cursor = head;
        while let Some(oid) = cursor {
            let commit = store.read_commit(oid).await?;
            let record = decode_record(&commit, path)?;
            cursor = record.parent;
            records.push(record);
        }
        self.loaded.insert(key, records);
        Ok(())
    }

    /// writes a new record as a commit, then advances the branch's head
    /// ref with a compare-and-swap — write and ref-move either both
    /// succeed or both appear not to have happened, per §4.5's guarantee
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        &mut self,
        refs: &dyn RefStore,
        store: &dyn ObjectStore,
        uuid: &str,
        path: &str,
        start: Revision,
        rev: Revision,
        object: Oid,
        is_tag: bool,
        author: &str,
        date: DateTime<Utc>,
        mergeinfo: Option<String>,
        svn_mergeinfo: Option<String>,
    ) -> GsvnResult<()> {
        let name = ref_name(uuid, path, start);
        let prior_head = refs.read(&name).await?;

        let commit = Commit {
            tree: object,
            parents: prior_head.into_iter().collect(),
            author: author.to_string(),
            committer: author.to_string(),
            date,
            message: encode_record_body(rev, path, date, object, is_tag, prior_head, &mergeinfo, &svn_mergeinfo),
        };
        let oid = store.write_commit(&commit).await?;
        refs.update(&name, prior_head, oid).await?;
        // best-effort: the `.log` companion is advisory (§6), unlike the
        // branch head itself it's fine for this to lag on contention
        let _ = refs.update(&log_ref_name(uuid, path, start), None, oid).await;

        let record = RevisionRecord {
            rev,
            object,
            is_tag,
            parent: prior_head,
            path: path.to_string(),
            date,
            mergeinfo,
            svn_mergeinfo,
        };
        self.loaded.entry((path.to_string(), start)).or_default().insert(0, record);
        Ok(())
    }
}

/// `type svn\ndate ...\n[+object <sha> commit|tag]\n[+parent <sha>]\n
/// revision N\npath /...\n[mergeinfo "..."]\n[svn:mergeinfo "..."]\n`
/// per spec.md §6's RevisionRecord body field order. `+object`/`+parent`
/// duplicate what the wrapping commit's own `tree`/`parents` fields
/// already carry (`object` *is* `tree`, `+parent` *is* the prior
/// RevisionRecord's oid, already the wrapper's first real parent) so the
/// body stays self-describing for tooling that only reads commit
/// messages.
fn encode_record_body(
    rev: Revision,
    path: &str,
    date: DateTime<Utc>,
    object: Oid,
    is_tag: bool,
    prior_head: Option<Oid>,
    mergeinfo: &Option<String>,
    svn_mergeinfo: &Option<String>,
) -> String {
    let mut body = String::new();
    body.push_str("type svn\n");
    body.push_str(&format!("date {}\n", date.to_rfc3339()));
    body.push_str(&format!("+object {} {}\n", hex::encode(object), if is_tag { "tag" } else { "commit" }));
    if let Some(parent) = prior_head {
        body.push_str(&format!("+parent {}\n", hex::encode(parent)));
    }
    body.push_str(&format!("revision {}\n", rev));
    body.push_str(&format!("path {}\n", path));
    if let Some(m) = mergeinfo {
        body.push_str(&format!("mergeinfo \"{}\"\n", m.replace('"', "\\\"")));
    }
    if let Some(m) = svn_mergeinfo {
        body.push_str(&format!("svn:mergeinfo \"{}\"\n", m.replace('"', "\\\"")));
    }
    body
}

fn decode_record(commit: &Commit, path: &str) -> GsvnResult<RevisionRecord> {
    let mut rev = None;
    let mut is_tag = false;
    let mut mergeinfo = None;
    let mut svn_mergeinfo = None;
    for line in commit.message.lines() {
        if let Some(v) = line.strip_prefix("+object ") {
            is_tag = v.trim_end().ends_with("tag");
        } else if let Some(v) = line.strip_prefix("revision ") {
            rev = v.parse().ok();
        } else if let Some(v) = line.strip_prefix("mergeinfo ") {
            mergeinfo = Some(unquote(v));
        } else if let Some(v) = line.strip_prefix("svn:mergeinfo ") {
            svn_mergeinfo = Some(unquote(v));
        }
    }
    let rev = rev.ok_or_else(|| GsvnError::protocol("revision record missing `revision` field"))?;
    Ok(RevisionRecord {
        rev,
        // the real referenced commit/tag oid lives in the wrapper's own
        // `tree` field (see `append`'s `Commit { tree: object, .. }`),
        // not the wrapper's own oid (that would point back at this
        // RevisionRecord itself, not the object it records).
        object: commit.tree,
        is_tag,
        parent: commit.parents.first().copied(),
        path: path.to_string(),
        date: commit.date,
        mergeinfo,
        svn_mergeinfo,
    })
}

fn unquote(s: &str) -> String {
    s.trim_matches('"').replace("\\\"", "\"")
}
