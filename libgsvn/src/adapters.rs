//! External adapters (C10): the narrow traits this crate needs from a real
//! git repository, object store, credential helper and HTTP stack. Grounded
//! on `libbit::transport::Transport` (an async trait with multiple runtime
//! implementations) and `libbit::odb`'s backend-agnostic object interface —
//! both keep the algorithmic crates ignorant of *how* bytes eventually reach
//! disk or the network. Production callers wire these to a real repository;
//! the in-memory implementations here exist so C6/C7/C8 can be exercised in
//! tests without one.

use crate::error::GsvnResult;
use crate::model::Revision;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

pub type Oid = [u8; 20];

pub const NULL_OID: Oid = [0u8; 20];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub oid: Oid,
    pub is_tree: bool,
    pub is_executable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: Oid,
    pub parents: Vec<Oid>,
    pub author: String,
    pub committer: String,
    pub date: DateTime<Utc>,
    pub message: String,
}

/// content-addressed storage for blobs, trees and commits, keyed by an
/// implementation-defined hash. Mirrors `libbit::odb`'s `read`/`write`
/// shape, generalised over the three object kinds this crate writes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn write_blob(&self, data: &[u8]) -> GsvnResult<Oid>;
    async fn read_blob(&self, oid: Oid) -> GsvnResult<Vec<u8>>;
    async fn write_tree(&self, tree: &Tree) -> GsvnResult<Oid>;
    async fn read_tree(&self, oid: Oid) -> GsvnResult<Tree>;
    async fn write_commit(&self, commit: &Commit) -> GsvnResult<Oid>;
    async fn read_commit(&self, oid: Oid) -> GsvnResult<Commit>;
    /// wraps `target` in an annotated tag object and returns its oid
    async fn write_tag(&self, target: Oid, tagger: &str, message: &str) -> GsvnResult<Oid>;
}

/// named, versioned pointers — one per branch slice plus the `.log`/`.tag`
/// companion refs described in spec.md §6's persisted-state section.
#[async_trait]
pub trait RefStore: Send + Sync {
    async fn read(&self, name: &str) -> GsvnResult<Option<Oid>>;
    /// compare-and-swap: succeeds only if the ref's current value equals
    /// `expected` (or is absent, when `expected` is `None`)
    async fn update(&self, name: &str, expected: Option<Oid>, new: Oid) -> GsvnResult<()>;
    async fn delete(&self, name: &str) -> GsvnResult<()>;
    async fn list_prefixed(&self, prefix: &str) -> GsvnResult<Vec<String>>;
}

/// the working index mutated by the editor-command machine in C7/C8:
/// a flat path → blob map standing in for git's real index file.
#[async_trait]
pub trait Index: Send + Sync {
    async fn clear(&self) -> GsvnResult<()>;
    async fn checkout_tree(&self, oid: Oid, store: &dyn ObjectStore) -> GsvnResult<()>;
    async fn set(&self, path: &str, oid: Oid, executable: bool) -> GsvnResult<()>;
    async fn remove(&self, path: &str) -> GsvnResult<()>;
    async fn remove_prefixed(&self, prefix: &str) -> GsvnResult<()>;
    async fn get(&self, path: &str) -> GsvnResult<Option<(Oid, bool)>>;
    /// every currently-set path starting with `prefix/` (or equal to
    /// `prefix` itself) — lets the editor machine tell whether a directory
    /// still has anything under it after a `delete-entry`
    async fn list_prefixed(&self, prefix: &str) -> GsvnResult<Vec<String>>;
    async fn write_tree(&self, store: &dyn ObjectStore) -> GsvnResult<Oid>;
}

/// a stored or freshly-prompted svn credential; see the `Author`/
/// `Credential` entities added to §3
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, realm: &str, username: Option<&str>) -> GsvnResult<crate::model::Credential>;
}

/// the subset of HTTP this crate ever needs (`svn+http`-tunnelled requests
/// for the rare server that exposes one); narrow on purpose, matching C10's
/// "external adapters stay narrow" framing
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> GsvnResult<Vec<u8>>;
}

/// all per-branch RevisionRecord metadata actually needed across a run,
/// independent of how it's persisted — C5 (`crate::cache`) reads/writes
/// this through [`RefStore`]/[`ObjectStore`]; C6/C7 read it directly.
#[derive(Debug, Clone)]
pub struct RevisionRecord {
    pub rev: Revision,
    pub object: Oid,
    pub is_tag: bool,
    pub parent: Option<Oid>,
    pub path: String,
    pub date: DateTime<Utc>,
    pub mergeinfo: Option<String>,
    pub svn_mergeinfo: Option<String>,
}

#[derive(Default)]
struct InMemoryState {
    blobs: HashMap<Oid, Vec<u8>>,
    trees: HashMap<Oid, Tree>,
    commits: HashMap<Oid, Commit>,
    tags: HashMap<Oid, (Oid, String, String)>,
    refs: HashMap<String, Oid>,
    index: HashMap<String, (Oid, bool)>,
    next_oid: u64,
}

/// an in-process stand-in for a real repository, backed by ordinary Rust
/// collections behind a mutex — good enough to drive the planners
/// end-to-end in tests without shelling out to `git`.
#[derive(Default)]
pub struct InMemoryRepo {
    state: Mutex<InMemoryState>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_oid(state: &mut InMemoryState) -> Oid {
        state.next_oid += 1;
        let n = state.next_oid;
        let mut oid = [0u8; 20];
        oid[12..20].copy_from_slice(&n.to_be_bytes());
        oid
    }
}

#[async_trait]
impl ObjectStore for InMemoryRepo {
    async fn write_blob(&self, data: &[u8]) -> GsvnResult<Oid> {
        let mut state = self.state.lock().unwrap();
        let oid = Self::fresh_oid(&mut state);
        state.blobs.insert(oid, data.to_vec());
        Ok(oid)
    }

    async fn read_blob(&self, oid: Oid) -> GsvnResult<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .blobs
            .get(&oid)
            .cloned()
            .ok_or_else(|| crate::error::GsvnError::MissingObject(hex::encode(oid)))
    }

    async fn write_tree(&self, tree: &Tree) -> GsvnResult<Oid> {
        let mut state = self.state.lock().unwrap();
        let oid = Self::fresh_oid(&mut state);
        state.trees.insert(oid, tree.clone());
        Ok(oid)
    }

    async fn read_tree(&self, oid: Oid) -> GsvnResult<Tree> {
        let state = self.state.lock().unwrap();
        state
            .trees
            .get(&oid)
            .cloned()
            .ok_or_else(|| crate::error::GsvnError::MissingObject(hex::encode(oid)))
    }

    async fn write_commit(&self, commit: &Commit) -> GsvnResult<Oid> {
        let mut state = self.state.lock().unwrap();
        let oid = Self::fresh_oid(&mut state);
        state.commits.insert(oid, commit.clone());
        Ok(oid)
    }

    async fn read_commit(&self, oid: Oid) -> GsvnResult<Commit> {
        let state = self.state.lock().unwrap();
        state
            .commits
            .get(&oid)
            .cloned()
            .ok_or_else(|| crate::error::GsvnError::MissingObject(hex::encode(oid)))
    }

    async fn write_tag(&self, target: Oid, tagger: &str, message: &str) -> GsvnResult<Oid> {
        let mut state = self.state.lock().unwrap();
        let oid = Self::fresh_oid(&mut state);
        state.tags.insert(oid, (target, tagger.to_string(), message.to_string()));
        Ok(oid)
    }
}

#[async_trait]
impl RefStore for InMemoryRepo {
    async fn read(&self, name: &str) -> GsvnResult<Option<Oid>> {
        Ok(self.state.lock().unwrap().refs.get(name).copied())
    }

    async fn update(&self, name: &str, expected: Option<Oid>, new: Oid) -> GsvnResult<()> {
        let mut state = self.state.lock().unwrap();
        let current = state.refs.get(name).copied();
        if current != expected {
            return Err(crate::error::GsvnError::conflict(
                name,
                "ref has moved since it was last read",
            ));
        }
        state.refs.insert(name.to_string(), new);
        Ok(())
    }

    async fn delete(&self, name: &str) -> GsvnResult<()> {
        self.state.lock().unwrap().refs.remove(name);
        Ok(())
    }

    async fn list_prefixed(&self, prefix: &str) -> GsvnResult<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .refs
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Index for InMemoryRepo {
    async fn clear(&self) -> GsvnResult<()> {
        self.state.lock().unwrap().index.clear();
        Ok(())
    }

    async fn checkout_tree(&self, oid: Oid, store: &dyn ObjectStore) -> GsvnResult<()> {
        self.clear().await?;
        if oid == NULL_OID {
            return Ok(());
        }
        let mut stack = vec![(String::new(), oid)];
        while let Some((prefix, oid)) = stack.pop() {
            let tree = store.read_tree(oid).await?;
            for entry in tree.entries {
                let path =
                    if prefix.is_empty() { entry.name.clone() } else { format!("{}/{}", prefix, entry.name) };
                if entry.is_tree {
                    stack.push((path, entry.oid));
                } else {
                    self.set(&path, entry.oid, entry.is_executable).await?;
                }
            }
        }
        Ok(())
    }

    async fn set(&self, path: &str, oid: Oid, executable: bool) -> GsvnResult<()> {
        self.state.lock().unwrap().index.insert(path.to_string(), (oid, executable));
        Ok(())
    }

    async fn remove(&self, path: &str) -> GsvnResult<()> {
        self.state.lock().unwrap().index.remove(path);
        Ok(())
    }

    async fn remove_prefixed(&self, prefix: &str) -> GsvnResult<()> {
        let dir_prefix = format!("{}/", prefix);
        self.state.lock().unwrap().index.retain(|p, _| p != prefix && !p.starts_with(&dir_prefix));
        Ok(())
    }

    async fn get(&self, path: &str) -> GsvnResult<Option<(Oid, bool)>> {
        Ok(self.state.lock().unwrap().index.get(path).copied())
    }

    async fn list_prefixed(&self, prefix: &str) -> GsvnResult<Vec<String>> {
        if prefix.is_empty() {
            return Ok(self.state.lock().unwrap().index.keys().cloned().collect());
        }
        let dir_prefix = format!("{}/", prefix);
        Ok(self
            .state
            .lock()
            .unwrap()
            .index
            .keys()
            .filter(|p| *p == prefix || p.starts_with(&dir_prefix))
            .cloned()
            .collect())
    }

    async fn write_tree(&self, store: &dyn ObjectStore) -> GsvnResult<Oid> {
        let entries: Vec<(String, Oid, bool)> = {
            let state = self.state.lock().unwrap();
            state.index.iter().map(|(p, (oid, exe))| (p.clone(), *oid, *exe)).collect()
        };
        build_tree(&entries, store).await
    }
}

/// folds a flat path → (oid, executable) map into a real tree hierarchy,
/// one [`ObjectStore::write_tree`] call per directory level, deepest first
async fn build_tree(entries: &[(String, Oid, bool)], store: &dyn ObjectStore) -> GsvnResult<Oid> {
    #[derive(Default)]
    struct Dir {
        files: Vec<(String, Oid, bool)>,
        subdirs: HashMap<String, Dir>,
    }

    let mut root = Dir::default();
    for (path, oid, executable) in entries {
        let mut components: Vec<&str> = path.split('/').collect();
        let file_name = components.pop().unwrap().to_string();
        let mut dir = &mut root;
        for component in components {
            dir = dir.subdirs.entry(component.to_string()).or_default();
        }
        dir.files.push((file_name, *oid, *executable));
    }

    fn write<'a>(
        dir: Dir,
        store: &'a dyn ObjectStore,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = GsvnResult<Oid>> + 'a>> {
        Box::pin(async move {
            let mut tree = Tree::default();
            for (name, oid, executable) in dir.files {
                tree.entries.push(TreeEntry { name, oid, is_tree: false, is_executable: executable });
            }
            for (name, subdir) in dir.subdirs {
                let oid = write(subdir, store).await?;
                tree.entries.push(TreeEntry { name, oid, is_tree: true, is_executable: false });
            }
            tree.entries.sort_by(|a, b| a.name.cmp(&b.name));
            store.write_tree(&tree).await
        })
    }

    write(root, store).await
}

#[cfg(test)]
mod tests;
