//! Fetch planner (C6): schedules `log` requests against C3, discovers
//! branch splits and copy-source links as log entries stream back, and
//! hands the update applier (C7) a per-branch, revision-ordered queue of
//! [`LogEntry`]s. Grounded on `remote-svn.c`'s `svnref`/`log_request`
//! machinery: `get_ref`/`set_ref_start` for the branch slice list (§4.6
//! "added"), `request_log`/`next_log`/`read_logs` for the scheduling loop,
//! reproduced with owned `Vec`/`HashMap` state instead of raw linked lists
//! and a `qsort`-then-pop queue.

use crate::model::{LogEntry, Revision};
use async_trait::async_trait;
use log::debug;
use std::collections::{HashMap, VecDeque};

pub type BranchId = usize;

/// one `(server-path, start-revision)` slice, per §3's Branch entity
#[derive(Debug, Clone)]
pub struct Branch {
    pub path: String,
    pub start: Revision,
    pub rev: Revision,
    pub log_rev: Revision,
    pub cmt_log_started: bool,
    pub cmt_log_finished: bool,
    pub need_copysrc_log: bool,
    pub is_tag: bool,
    pub head: Option<[u8; 20]>,
    /// log entries accumulated for this slice, oldest first
    pub pending: Vec<LogEntry>,
    /// the slice this branch was copy-sourced from, if known
    pub copy_source: Option<BranchId>,
    /// `(copier, copy_rev)`: branches copy-sourced from this one, together
    /// with the revision at which the copy happened — needed so a later
    /// split can tell which copiers belong on the carved-off older slice
    pub copiers: Vec<(BranchId, Revision)>,
    pub local_refs: Vec<String>,
}

impl Branch {
    fn new(path: String, start: Revision) -> Self {
        Self {
            path,
            start,
            rev: 0,
            log_rev: start.saturating_sub(1),
            cmt_log_started: false,
            cmt_log_finished: false,
            need_copysrc_log: false,
            is_tag: false,
            head: None,
            pending: Vec::new(),
            copy_source: None,
            copiers: Vec::new(),
            local_refs: Vec::new(),
        }
    }
}

/// owns every known [`Branch`] slice; per path, slices are kept sorted
/// newest-start-first so lookup can return the first whose `start <= rev`,
/// exactly as `get_ref`'s linear scan does over its linked list
#[derive(Default)]
pub struct BranchRegistry {
    branches: Vec<Branch>,
    by_path: HashMap<String, Vec<BranchId>>,
}

impl BranchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: BranchId) -> &Branch {
        &self.branches[id]
    }

    pub fn get_mut(&mut self, id: BranchId) -> &mut Branch {
        &mut self.branches[id]
    }

    /// `get_ref`: returns the existing slice covering `rev`, or creates a
    /// fresh `start = 0` slice assuming (until proven otherwise by a
    /// later [`split`](Self::split)) that it is the newest one that fits
    pub fn get_or_create(&mut self, path: &str, rev: Revision) -> BranchId {
        if let Some(ids) = self.by_path.get(path) {
            for &id in ids {
                if rev >= self.branches[id].start {
                    return id;
                }
            }
        }
        let id = self.branches.len();
        self.branches.push(Branch::new(path.to_string(), 0));
        self.by_path.entry(path.to_string()).or_default().push(id);
        id
    }

    /// `set_ref_start`: carves an older slice off `id` holding its
    /// previous `rev`/`head`, then raises `id`'s own `start` to
    /// `new_start`. Copiers whose `copy_rev` predates `new_start` are
    /// rewired onto the new older slice, since their copy necessarily
    /// happened from that earlier incarnation.
    pub fn split(&mut self, id: BranchId, new_start: Revision) -> BranchId {
        let cur = self.branches[id].clone();
        assert!(new_start > cur.start, "split must move `start` later, never earlier");

        let mut older = Branch::new(cur.path.clone(), cur.start);
        older.rev = cur.rev;
        older.log_rev = cur.rev;
        older.head = cur.head;
        older.is_tag = cur.is_tag;
        let older_id = self.branches.len();
        self.branches.push(older);

        {
            let cur = &mut self.branches[id];
            cur.head = None;
            cur.rev = 0;
            cur.start = new_start;
        }

        let list = self.by_path.get_mut(&cur.path).expect("split target must be registered");
        let pos = list.iter().position(|&x| x == id).expect("split target must be in its own path list");
        list.insert(pos + 1, older_id);

        let (moved, kept): (Vec<_>, Vec<_>) =
            self.branches[id].copiers.drain(..).partition(|&(_, copy_rev)| copy_rev < new_start);
        self.branches[id].copiers = kept;
        for &(copier, copy_rev) in &moved {
            self.branches[copier].copy_source = Some(older_id);
        }
        self.branches[older_id].copiers = moved;

        older_id
    }
}

/// what the fetch planner needs from C3: one `log` call per request,
/// kept abstract so the scheduling logic can be tested without a real
/// server connection
#[async_trait]
pub trait LogSource: Send {
    async fn log(
        &mut self,
        path: &str,
        start: Revision,
        end: Revision,
        changed_paths: bool,
    ) -> crate::error::GsvnResult<Vec<LogEntry>>;
}

struct Request {
    branch: BranchId,
    target_rev: Revision,
}

/// drains a queue of `(branch, target_rev)` log requests, discovering
/// splits and copy-source links as entries stream back, until every
/// branch's log is caught up through its requested revision
pub struct FetchPlanner<L> {
    source: L,
    registry: BranchRegistry,
    queue: VecDeque<Request>,
}

impl<L: LogSource> FetchPlanner<L> {
    pub fn new(source: L, registry: BranchRegistry) -> Self {
        Self { source, registry, queue: VecDeque::new() }
    }

    pub fn registry(&self) -> &BranchRegistry {
        &self.registry
    }

    pub fn into_registry(self) -> BranchRegistry {
        self.registry
    }

    /// enqueues `(branch, target_rev)`, merging with any pending request
    /// for the same branch and reopening a branch whose log was already
    /// finished if the new target extends past what it has seen
    pub fn request(&mut self, branch: BranchId, target_rev: Revision) {
        if let Some(existing) = self.queue.iter_mut().find(|r| r.branch == branch) {
            existing.target_rev = existing.target_rev.max(target_rev);
            return;
        }
        let b = self.registry.get_mut(branch);
        if b.cmt_log_finished && target_rev > b.log_rev {
            b.cmt_log_finished = false;
        }
        self.queue.push_back(Request { branch, target_rev });
    }

    /// drains the queue, issuing one `log` call per request (adjacent
    /// requests against the same branch covering contiguous ranges
    /// are coalesced by [`Self::request`] before they ever reach here)
    pub async fn run(&mut self) -> crate::error::GsvnResult<()> {
        while let Some(req) = self.queue.pop_front() {
            self.process(req).await?;
        }
        Ok(())
    }

    async fn process(&mut self, req: Request) -> crate::error::GsvnResult<()> {
        let branch = self.registry.get(req.branch).clone();
        let start = if branch.cmt_log_started { branch.log_rev + 1 } else { branch.start };
        debug!("fetch log {} r{}..r{}", branch.path, start, req.target_rev);
        self.registry.get_mut(req.branch).cmt_log_started = true;

        if branch.need_copysrc_log {
            let entries = self.source.log(&branch.path, branch.start, branch.start, true).await?;
            self.registry.get_mut(req.branch).need_copysrc_log = false;
            for entry in entries {
                self.handle_entry(req.branch, entry)?;
            }
        }

        if req.target_rev >= start {
            let entries = self.source.log(&branch.path, start, req.target_rev, true).await?;
            for entry in entries {
                self.handle_entry(req.branch, entry)?;
            }
        }

        let b = self.registry.get_mut(req.branch);
        b.log_rev = req.target_rev;
        b.cmt_log_finished = true;
        Ok(())
    }

    fn handle_entry(&mut self, branch_id: BranchId, entry: LogEntry) -> crate::error::GsvnResult<()> {
        let branch = self.registry.get(branch_id);
        let branch_start = branch.start;

        if entry.rev < branch_start {
            // a stray ancestor beyond the slice boundary is a duplicate of
            // the branch's already-known head when its revision matches
            // `rev`; anything else is evidence of a copy, not yet seen
            // because the server's plain log call doesn't report
            // changed-paths for it.
            if entry.rev == branch.rev {
                return Ok(());
            }
            self.registry.get_mut(branch_id).need_copysrc_log = true;
            return Ok(());
        }

        // a copy/replace revealed at a later start splits off the
        // branch's prior history into an older slice; `branch_id` itself
        // keeps representing the branch, now starting at `entry.rev`
        if entry.copy_source.is_some() && entry.rev > branch_start {
            debug!("branch {} splits at r{}", self.registry.get(branch_id).path, entry.rev);
            self.registry.split(branch_id, entry.rev);
        }

        if let Some((copy_path, copy_rev)) = entry.copy_source.clone() {
            let copy_branch = self.registry.get_or_create(&copy_path, copy_rev);
            self.registry.get_mut(copy_branch).copiers.push((branch_id, copy_rev));
            self.registry.get_mut(branch_id).copy_source = Some(copy_branch);
            self.request(copy_branch, copy_rev);
        }

        let b = self.registry.get_mut(branch_id);
        b.rev = entry.rev;
        b.pending.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
