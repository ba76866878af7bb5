//! Push planner (C8): classifies every commit reachable from a ref update
//! against what the svn side already has, walks the result into per-branch
//! first-parent chains, and turns each chain entry into an editor-command
//! drive. Grounded on `remote-svn.c` lines ~1240-1420: the
//! `SECOND_PARENT`/`FIRST_PARENT_TAG`/`FIRST_PARENT_NEW`/`FIRST_PARENT`/
//! `IN_SVN`/`SVNCMT` classification, `insert_commit`'s monotonic-upgrade
//! rule, and `push()`'s seed-then-walk traversal — reproduced as a plain
//! worklist rather than a date-sorted queue, since commits here carry no
//! timestamp to sort by and only the seed→parent edges matter for
//! correctness.

use crate::adapters::{NULL_OID, ObjectStore, Oid, Tree, TreeEntry};
use crate::delta::Delta;
use crate::error::{GsvnError, GsvnResult};
use crate::model::Revision;
use crate::protocol::EditorOp;
use async_trait::async_trait;
use log::debug;
use std::collections::{HashMap, VecDeque};

/// mirrors the C original's priority ordering: a commit's classification
/// only ever moves up this list, never down (see [`PushPlanner::insert`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommitType {
    /// reachable only through a non-first parent: never pushed on its own
    SecondParent,
    /// first commit of a brand new tag, pushed as a copy
    FirstParentTag,
    /// first commit of a brand new branch
    FirstParentNew,
    /// an ordinary commit on a branch that already exists on the svn side
    FirstParent,
    /// already represented by an existing [`crate::cache::RevisionRecord`]
    InSvn,
    /// the tip of an existing svn-tracked ref, seeded before the walk
    SvnCmt,
}

#[derive(Debug, Clone)]
pub struct PushTarget {
    pub svn_path: String,
    pub is_tag: bool,
    /// true when this push replaces an existing ref at the destination
    /// (always true for tags, since svn tags are conventionally immutable
    /// and a second push onto one is a replace, not a fast-forward)
    pub replace: bool,
}

/// §4.8's "per-commit operation kind": how one chain entry is represented
/// as an svn revision, independent of its [`CommitType`] classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// the destination branch did not exist at the server's head when the
    /// push started; only the chain's first entry can be this
    Add,
    /// `force`, a diverged first parent, or an intermediate server
    /// revision touching the branch since the planner's known `log_rev`
    Replace,
    /// the ordinary case: a fast-forward onto the branch's current head
    Modify,
    /// an empty `new_head`: the ref itself is being removed server-side
    Delete,
}

pub struct PushPlanner<'a> {
    store: &'a dyn ObjectStore,
    types: HashMap<Oid, CommitType>,
    targets: HashMap<Oid, PushTarget>,
}

impl<'a> PushPlanner<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store, types: HashMap::new(), targets: HashMap::new() }
    }

    /// `insert_commit`: no-op if the commit's existing classification is
    /// already at least as specific; otherwise installs the new
    /// classification (and, for first-parent kinds, the destination it
    /// propagates) and reports whether anything changed.
    fn insert(&mut self, commit: Oid, typ: CommitType, target: Option<PushTarget>) -> bool {
        if let Some(&existing) = self.types.get(&commit) {
            if existing >= typ {
                return false;
            }
        }
        self.types.insert(commit, typ);
        if let Some(t) = target {
            self.targets.insert(commit, t);
        }
        true
    }

    /// seeds an existing svn-tracked branch head: everything behind it is
    /// already represented server-side and the walk should stop there.
    pub fn seed_existing_head(&mut self, commit: Oid) {
        self.insert(commit, CommitType::SvnCmt, None);
    }

    /// seeds the tip of a ref update: `branch_exists` distinguishes a
    /// fast-forward onto an already-tracked branch from the first commit
    /// of a brand new one, and `target.is_tag` upgrades to the
    /// copy-based tag classification regardless of either.
    pub fn seed_push_target(&mut self, commit: Oid, target: PushTarget, branch_exists: bool) {
        let typ = if target.is_tag {
            CommitType::FirstParentTag
        } else if branch_exists {
            CommitType::FirstParent
        } else {
            CommitType::FirstParentNew
        };
        debug!("seeding {} as {:?} -> {}", hex::encode(commit), typ, target.svn_path);
        self.insert(commit, typ, Some(target));
    }

    /// walks every seeded commit's parents to a fixed point, classifying
    /// ancestors and propagating each first-parent chain's destination
    /// branch down to its own first parent; every other parent is marked
    /// `SecondParent` and never contributes its own push.
    pub async fn classify(&mut self, seeds: &[Oid]) -> GsvnResult<()> {
        let mut queue: VecDeque<Oid> = seeds.iter().copied().collect();
        while let Some(oid) = queue.pop_front() {
            let typ = match self.types.get(&oid) {
                Some(&t) => t,
                None => continue,
            };
            if typ >= CommitType::InSvn {
                continue;
            }
            let commit = self.store.read_commit(oid).await?;
            let target = self.targets.get(&oid).cloned();
            for (i, &parent) in commit.parents.iter().enumerate() {
                let changed = if i == 0 {
                    self.insert(parent, typ, target.clone())
                } else {
                    self.insert(parent, CommitType::SecondParent, None)
                };
                if changed {
                    queue.push_back(parent);
                }
            }
        }
        Ok(())
    }

    pub fn classification_of(&self, commit: Oid) -> Option<CommitType> {
        self.types.get(&commit).copied()
    }

    pub fn target_of(&self, commit: Oid) -> Option<&PushTarget> {
        self.targets.get(&commit)
    }

    /// `head`'s first-parent chain of commits still needing a push,
    /// oldest first, stopping at the first commit already on the svn
    /// side (or already pushed in an earlier run of this planner).
    pub async fn chain_to_push(&self, head: Oid) -> GsvnResult<Vec<Oid>> {
        let mut chain = Vec::new();
        let mut cursor = Some(head);
        while let Some(oid) = cursor {
            match self.types.get(&oid) {
                Some(t) if *t < CommitType::InSvn => {
                    chain.push(oid);
                    let commit = self.store.read_commit(oid).await?;
                    cursor = commit.parents.first().copied();
                }
                _ => break,
            }
        }
        chain.reverse();
        Ok(chain)
    }

    /// assigns an [`OperationKind`] to each entry of `head`'s chain, per
    /// §4.8: the first entry is `Add` when the destination branch is new,
    /// otherwise every entry is `Replace` when `force` is set or an
    /// intermediate server revision has landed since the planner's known
    /// `log_rev`, or when its first parent drifted from what the branch's
    /// server head was expected to be at that point in the chain; `Modify`
    /// otherwise. Does not handle `Delete`: an empty `new_head` never
    /// reaches a commit chain at all and is decided by the caller before
    /// calling this.
    pub async fn plan_commit_kinds(
        &self,
        head: Oid,
        branch_exists: bool,
        force: bool,
        server_head: Option<Oid>,
        touched_since_log_rev: bool,
    ) -> GsvnResult<Vec<(Oid, OperationKind)>> {
        let chain = self.chain_to_push(head).await?;
        let mut plan = Vec::with_capacity(chain.len());
        let mut expected_parent = server_head;
        for (i, &commit) in chain.iter().enumerate() {
            let kind = if i == 0 && !branch_exists {
                OperationKind::Add
            } else {
                let obj = self.store.read_commit(commit).await?;
                let first_parent_matches = obj.parents.first().copied() == expected_parent;
                if force || !first_parent_matches || (i == 0 && touched_since_log_rev) {
                    OperationKind::Replace
                } else {
                    OperationKind::Modify
                }
            };
            debug!("{}: {:?}", hex::encode(commit), kind);
            plan.push((commit, kind));
            expected_parent = Some(commit);
        }
        Ok(plan)
    }
}

/// fails unless the destination is still exactly where this push's plan
/// was computed against, mirroring §4.8's intermediate-commit guard:
/// another committer landing revisions in the gap makes this push's tree
/// diffs stale, and only `force` may override that.
pub fn check_no_intermediate_commits(
    branch_path: &str,
    expected_rev: Revision,
    server_latest: Revision,
    force: bool,
) -> GsvnResult<()> {
    if !force && server_latest > expected_rev {
        log::warn!(
            "{}: server at r{} has moved past the plan's r{}, refusing push",
            branch_path,
            server_latest,
            expected_rev
        );
        return Err(GsvnError::conflict(
            branch_path,
            format!("server is at r{} but this push was planned against r{}", server_latest, expected_rev),
        ));
    }
    Ok(())
}

/// emits a single `add-dir` with `copy-from` set, the cheap server-side
/// copy svn uses for tag creation and branch-from-branch pushes that
/// don't touch any file.
pub struct CopyEditorSource {
    op: Option<EditorOp>,
}

impl CopyEditorSource {
    pub fn new(path: String, copy_from_path: String, copy_from_rev: Revision) -> Self {
        Self { op: Some(EditorOp::AddDir { path, copy_from: Some((copy_from_path, copy_from_rev)) }) }
    }
}

#[async_trait]
impl crate::protocol::EditorSource for CopyEditorSource {
    async fn next_op(&mut self) -> GsvnResult<Option<EditorOp>> {
        Ok(self.op.take())
    }
}

/// emits a single `delete-entry` for `path`: the `Delete` operation kind's
/// whole drive, for a ref update whose `new_head` is empty.
pub struct DeleteEditorSource {
    op: Option<EditorOp>,
}

impl DeleteEditorSource {
    pub fn new(path: String) -> Self {
        Self { op: Some(EditorOp::DeleteEntry { path }) }
    }
}

#[async_trait]
impl crate::protocol::EditorSource for DeleteEditorSource {
    async fn next_op(&mut self) -> GsvnResult<Option<EditorOp>> {
        Ok(self.op.take())
    }
}

/// a precomputed tree diff, replayed one [`EditorOp`] at a time.
pub struct DiffEditorSource {
    ops: VecDeque<EditorOp>,
}

impl DiffEditorSource {
    pub async fn new(store: &dyn ObjectStore, old_tree: Oid, new_tree: Oid) -> GsvnResult<Self> {
        let mut ops = Vec::new();
        diff_trees(store, old_tree, new_tree, "", &mut ops).await?;
        Ok(Self { ops: ops.into() })
    }
}

#[async_trait]
impl crate::protocol::EditorSource for DiffEditorSource {
    async fn next_op(&mut self) -> GsvnResult<Option<EditorOp>> {
        Ok(self.ops.pop_front())
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// emits the ops to add `oid` (file or subtree) fresh at `path`, with no
/// corresponding entry on the old side at all.
async fn add_fresh(store: &dyn ObjectStore, entry: &TreeEntry, path: &str, ops: &mut Vec<EditorOp>) -> GsvnResult<()> {
    if entry.is_tree {
        ops.push(EditorOp::AddDir { path: path.to_string(), copy_from: None });
        diff_trees(store, NULL_OID, entry.oid, path, ops).await?;
        ops.push(EditorOp::CloseDir);
    } else {
        let content = store.read_blob(entry.oid).await?;
        ops.push(EditorOp::AddFile { path: path.to_string() });
        ops.push(EditorOp::ApplyTextDelta { content: Delta::encode(&content, true)? });
        ops.push(EditorOp::CloseFile);
    }
    Ok(())
}

fn delete_subtree(path: &str, ops: &mut Vec<EditorOp>) {
    ops.push(EditorOp::DeleteEntry { path: path.to_string() });
}

/// `cmt_read`'s per-changed-path classification (add/modify/delete/
/// replace), reproduced here directly against two tree snapshots instead
/// of against svn's own changed-path log, since on the push side this
/// crate always has both trees in hand already. Boxed for recursion, same
/// shape as [`crate::adapters::build_tree`]'s own recursive helper.
fn diff_trees<'a>(
    store: &'a dyn ObjectStore,
    old: Oid,
    new: Oid,
    prefix: &'a str,
    ops: &'a mut Vec<EditorOp>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = GsvnResult<()>> + 'a>> {
    Box::pin(async move {
        let old_tree = if old == NULL_OID { Tree::default() } else { store.read_tree(old).await? };
        let new_tree = if new == NULL_OID { Tree::default() } else { store.read_tree(new).await? };
        let mut old_by_name: HashMap<&str, &TreeEntry> =
            old_tree.entries.iter().map(|e| (e.name.as_str(), e)).collect();

        for entry in &new_tree.entries {
            let path = join(prefix, &entry.name);
            match old_by_name.remove(entry.name.as_str()) {
                None => add_fresh(store, entry, &path, ops).await?,
                Some(old_entry) if old_entry.oid == entry.oid => {} // unchanged
                Some(old_entry) if old_entry.is_tree && entry.is_tree => {
                    ops.push(EditorOp::OpenDir { path: path.clone() });
                    diff_trees(store, old_entry.oid, entry.oid, &path, ops).await?;
                    ops.push(EditorOp::CloseDir);
                }
                Some(old_entry) if !old_entry.is_tree && !entry.is_tree => {
                    ops.push(EditorOp::OpenFile { path: path.clone() });
                    let content = store.read_blob(entry.oid).await?;
                    ops.push(EditorOp::ApplyTextDelta { content: Delta::encode(&content, true)? });
                    ops.push(EditorOp::CloseFile);
                }
                Some(_) => {
                    // a file replaced by a directory or vice versa: svn
                    // has no in-place kind change, so replace wholesale
                    delete_subtree(&path, ops);
                    add_fresh(store, entry, &path, ops).await?;
                }
            }
        }
        for (name, _) in old_by_name {
            delete_subtree(&join(prefix, name), ops);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests;
