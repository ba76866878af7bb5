//! Update applier (C7): turns one server `update` editor drive into a git
//! commit. Grounded on spec.md §4.7's per-LogEntry algorithm (the
//! copy-without-modification fast path, the editor-driven index mutation,
//! then tree/commit/record assembly) and `remote-svn.c`'s mergeinfo
//! assembly around `cmt_read` (inherited mergeinfo from the copy source,
//! merged with this revision's own `svn:mergeinfo` property via
//! [`Mergeinfo::merge`]).

use crate::adapters::{Commit, Index, NULL_OID, ObjectStore, Oid, RefStore};
use crate::authors::AuthorsFile;
use crate::cache::RevisionCache;
use crate::error::GsvnResult;
use crate::model::{LogEntry, Mergeinfo, Revision};
use crate::path::validate_path;
use crate::protocol::EditorSink;
use async_trait::async_trait;
use log::{debug, info};

/// receive side of an editor drive: mutates `index` as commands arrive,
/// buffering an open file's textdelta stream until `close-file` so it can
/// be decoded against the checked-out base in one shot. Directory/file
/// paths always arrive in full (never relative to a parent stack), so no
/// path-joining state is needed beyond the currently-open file.
pub struct IndexEditor<'a> {
    index: &'a dyn Index,
    store: &'a dyn ObjectStore,
    open: Option<OpenFile>,
}

struct OpenFile {
    path: String,
    base: Vec<u8>,
    delta: Vec<u8>,
    started: bool,
    is_new: bool,
}

impl<'a> IndexEditor<'a> {
    pub fn new(index: &'a dyn Index, store: &'a dyn ObjectStore) -> Self {
        Self { index, store, open: None }
    }

    /// a directory with any entry is never empty, so adding one under a
    /// parent means that parent's own `.gitempty` sentinel is stale
    async fn drop_parent_sentinel(&self, path: &str) -> GsvnResult<()> {
        if let Some((parent, _)) = path.rsplit_once('/') {
            self.index.remove(&format!("{}/.gitempty", parent)).await?;
        }
        Ok(())
    }

    /// after removing an entry, put the sentinel back if the directory it
    /// lived in has nothing left under it
    async fn restore_sentinel_if_empty(&self, dir: &str) -> GsvnResult<()> {
        let sentinel = if dir.is_empty() { ".gitempty".to_string() } else { format!("{}/.gitempty", dir) };
        if self.index.list_prefixed(dir).await?.is_empty() {
            let oid = self.store.write_blob(b"").await?;
            self.index.set(&sentinel, oid, false).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EditorSink for IndexEditor<'_> {
    async fn add_dir(&mut self, path: &str) -> GsvnResult<()> {
        validate_path(path)?;
        self.drop_parent_sentinel(path).await?;
        let oid = self.store.write_blob(b"").await?;
        self.index.set(&format!("{}/.gitempty", path), oid, false).await?;
        Ok(())
    }

    async fn open_dir(&mut self, path: &str) -> GsvnResult<()> {
        validate_path(path)?;
        Ok(())
    }

    async fn delete_entry(&mut self, path: &str) -> GsvnResult<()> {
        validate_path(path)?;
        self.index.remove(path).await?;
        self.index.remove_prefixed(path).await?;
        let parent = path.rsplit_once('/').map(|(p, _)| p.to_string()).unwrap_or_default();
        self.restore_sentinel_if_empty(&parent).await?;
        Ok(())
    }

    async fn add_file(&mut self, path: &str) -> GsvnResult<()> {
        validate_path(path)?;
        self.drop_parent_sentinel(path).await?;
        self.open =
            Some(OpenFile { path: path.to_string(), base: Vec::new(), delta: Vec::new(), started: false, is_new: true });
        Ok(())
    }

    async fn open_file(&mut self, path: &str) -> GsvnResult<()> {
        validate_path(path)?;
        self.open = Some(OpenFile {
            path: path.to_string(),
            base: Vec::new(),
            delta: Vec::new(),
            started: false,
            is_new: false,
        });
        Ok(())
    }

    async fn begin_textdelta(&mut self) -> GsvnResult<()> {
        let open = self.open.as_mut().ok_or_else(|| {
            crate::error::GsvnError::protocol("apply-textdelta with no open file")
        })?;
        if let Some((oid, _)) = self.index.get(&open.path).await? {
            open.base = self.store.read_blob(oid).await?;
        }
        open.started = true;
        Ok(())
    }

    async fn textdelta_chunk(&mut self, chunk: &[u8]) -> GsvnResult<()> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| crate::error::GsvnError::protocol("textdelta-chunk with no open file"))?;
        open.delta.extend_from_slice(chunk);
        Ok(())
    }

    async fn end_textdelta(&mut self) -> GsvnResult<()> {
        let open = self
            .open
            .as_mut()
            .ok_or_else(|| crate::error::GsvnError::protocol("textdelta-end with no open file"))?;
        let delta = crate::delta::Delta::decode(&open.delta)?;
        let content = delta.apply(&open.base)?;
        let executable = self.index.get(&open.path).await?.map(|(_, x)| x).unwrap_or(false);
        let oid = self.store.write_blob(&content).await?;
        self.index.set(&open.path, oid, executable).await?;
        open.delta.clear();
        Ok(())
    }

    async fn close_file(&mut self) -> GsvnResult<()> {
        let open = self.open.take().ok_or_else(|| crate::error::GsvnError::protocol("close-file with no open file"))?;
        if !open.started && open.is_new {
            // a brand new file with no textdelta at all: an empty file
            let oid = self.store.write_blob(b"").await?;
            self.index.set(&open.path, oid, false).await?;
        }
        Ok(())
    }

    async fn close_dir(&mut self) -> GsvnResult<()> {
        Ok(())
    }
}

/// everything about a branch the applier needs in order to commit one
/// more revision onto it
pub struct BranchState {
    pub path: String,
    pub start: Revision,
    pub is_tag: bool,
    pub head: Option<Oid>,
    /// the copy source branch's current head, when this revision copies
    /// from one (used both for the fast path and as the checkout base)
    pub copy_source_head: Option<Oid>,
    /// the copy source's last recorded mergeinfo, inherited onto this one
    pub inherited_mergeinfo: Option<String>,
}

/// drives one server update reply into a commit, then records it.
pub struct UpdateApplier<'a> {
    pub index: &'a dyn Index,
    pub store: &'a dyn ObjectStore,
    pub refs: &'a dyn RefStore,
    pub cache: &'a mut RevisionCache,
    pub authors: &'a AuthorsFile,
    pub uuid: String,
}

impl<'a> UpdateApplier<'a> {
    /// applies `entry` onto `branch`, returning the new head object.
    ///
    /// `drive` receives the editor sink wired to this applier's index and
    /// store; it should read the server's update reply and forward each
    /// command into it (typically `Client::drive_update`). It is not
    /// called at all on the copy-without-modification fast path, since no
    /// editor drive happens then.
    pub async fn apply_entry<F, Fut>(
        &mut self,
        branch: &BranchState,
        entry: &LogEntry,
        explicit_svn_mergeinfo: Option<&str>,
        drive: F,
    ) -> GsvnResult<Oid>
    where
        F: FnOnce(IndexEditor<'_>) -> Fut,
        Fut: std::future::Future<Output = GsvnResult<()>>,
    {
        let (mergeinfo, svn_mergeinfo) =
            assemble_mergeinfo(explicit_svn_mergeinfo, branch.inherited_mergeinfo.as_deref())?;

        // fast path: a copy that nothing in this revision modifies needs
        // no tree work at all, just a new record pointing at the copy
        // source's existing head object
        if entry.copy_source.is_some() && !entry.copy_modified {
            debug!("r{}: unmodified copy, reusing copy source head", entry.rev);
            let object = branch
                .copy_source_head
                .ok_or_else(|| crate::error::GsvnError::protocol("copy source has no head to reuse"))?;
            return self.finish(branch, entry, object, mergeinfo, svn_mergeinfo).await;
        }

        let base_head = if entry.copy_source.is_some() { branch.copy_source_head } else { branch.head };
        let base_tree = match base_head {
            Some(head) => self.store.read_commit(head).await?.tree,
            None => NULL_OID,
        };
        self.index.checkout_tree(base_tree, self.store).await?;

        drive(IndexEditor::new(self.index, self.store)).await?;

        let tree = self.index.write_tree(self.store).await?;
        let author = ident_for(self.authors, entry.author.as_deref(), &self.uuid);
        let commit = Commit {
            tree,
            parents: branch.head.into_iter().collect(),
            author: author.clone(),
            committer: author,
            date: entry.timestamp,
            message: entry.message.clone(),
        };
        let object = self.store.write_commit(&commit).await?;

        self.finish(branch, entry, object, mergeinfo, svn_mergeinfo).await
    }

    /// wraps `commit_object` in an annotated tag when the branch is a tag
    /// (§4.7 "Tag semantics": svn tags are always represented as a tag
    /// object pointing at whatever commit the tag's content corresponds
    /// to, whether that commit is freshly made or reused from a copy),
    /// then appends the revision record.
    async fn finish(
        &mut self,
        branch: &BranchState,
        entry: &LogEntry,
        commit_object: Oid,
        mergeinfo: Option<String>,
        svn_mergeinfo: Option<String>,
    ) -> GsvnResult<Oid> {
        let author = ident_for(self.authors, entry.author.as_deref(), &self.uuid);
        let object = if branch.is_tag {
            self.store.write_tag(commit_object, &author, &entry.message).await?
        } else {
            commit_object
        };

        self.cache
            .append(
                self.refs,
                self.store,
                &self.uuid,
                &branch.path,
                branch.start,
                entry.rev,
                object,
                branch.is_tag,
                &author,
                entry.timestamp,
                mergeinfo,
                svn_mergeinfo,
            )
            .await?;
        info!("r{} ({}) -> commit {}", entry.rev, branch.path, hex::encode(object));
        Ok(object)
    }
}

fn ident_for(authors: &AuthorsFile, username: Option<&str>, uuid: &str) -> String {
    match username {
        Some(u) => authors.to_ident(u, uuid),
        None => format!("(no author) <nobody@{}>", uuid),
    }
}

/// `mergeinfo`/`svn_mergeinfo`: the former is this revision's effective
/// merge set (inherited from the copy source, overlaid with whatever this
/// revision's own `svn:mergeinfo` property adds), the latter is that raw
/// property value verbatim, kept so a later push can round-trip it.
fn assemble_mergeinfo(
    explicit: Option<&str>,
    inherited: Option<&str>,
) -> GsvnResult<(Option<String>, Option<String>)> {
    let mut merged = match inherited {
        Some(s) => Mergeinfo::parse(s)?,
        None => Mergeinfo::new(),
    };
    if let Some(explicit) = explicit {
        let explicit_mi = Mergeinfo::parse(explicit)?;
        merged.merge(&explicit_mi, &Mergeinfo::new());
    }
    let mergeinfo = if merged.paths.is_empty() { None } else { Some(merged.serialize()) };
    Ok((mergeinfo, explicit.map(str::to_string)))
}
