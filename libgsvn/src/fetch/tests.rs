use super::*;
use crate::model::{ChangeKind, ChangedPath, NodeKind};
use chrono::Utc;
use std::collections::HashMap;

fn entry(rev: Revision, copy_source: Option<(&str, Revision)>) -> LogEntry {
    LogEntry {
        rev,
        author: Some("alice".to_string()),
        timestamp: Utc::now(),
        message: format!("r{}", rev),
        changed_paths: vec![ChangedPath {
            path: "/whatever".to_string(),
            kind: ChangeKind::Modify,
            node_kind: NodeKind::File,
            copy_source: copy_source.map(|(p, r)| (p.to_string(), r)),
        }],
        copy_source: copy_source.map(|(p, r)| (p.to_string(), r)),
        copy_modified: false,
    }
}

/// scripted [`LogSource`]: a fixed map of `(path, start, end) -> entries`
struct ScriptedSource {
    scripts: HashMap<(String, Revision, Revision), Vec<LogEntry>>,
}

#[async_trait]
impl LogSource for ScriptedSource {
    async fn log(
        &mut self,
        path: &str,
        start: Revision,
        end: Revision,
        _changed_paths: bool,
    ) -> crate::error::GsvnResult<Vec<LogEntry>> {
        Ok(self.scripts.get(&(path.to_string(), start, end)).cloned().unwrap_or_default())
    }
}

#[test]
fn get_or_create_returns_same_branch_for_the_same_path() {
    let mut reg = BranchRegistry::new();
    let a = reg.get_or_create("/trunk", 5);
    let b = reg.get_or_create("/trunk", 9);
    assert_eq!(a, b);
}

#[test]
fn split_carves_an_older_slice_and_raises_the_original_start() {
    let mut reg = BranchRegistry::new();
    let id = reg.get_or_create("/branches/x", 10);
    reg.get_mut(id).rev = 10;
    reg.get_mut(id).head = Some([1; 20]);

    let older = reg.split(id, 20);

    assert_eq!(reg.get(id).start, 20);
    assert_eq!(reg.get(id).head, None);
    assert_eq!(reg.get(older).start, 10);
    assert_eq!(reg.get(older).rev, 10);
    assert_eq!(reg.get(older).head, Some([1; 20]));

    // a later lookup at a revision below the new start finds the older slice
    assert_eq!(reg.get_or_create("/branches/x", 15), older);
    assert_eq!(reg.get_or_create("/branches/x", 20), id);
}

#[test]
fn split_rewires_copiers_whose_copy_rev_predates_the_new_start() {
    let mut reg = BranchRegistry::new();
    let trunk = reg.get_or_create("/trunk", 0);
    let early_copier = reg.get_or_create("/branches/early", 5);
    let late_copier = reg.get_or_create("/branches/late", 25);
    reg.get_mut(trunk).copiers.push((early_copier, 5));
    reg.get_mut(trunk).copiers.push((late_copier, 25));

    let older = reg.split(trunk, 20);

    assert_eq!(reg.get(trunk).copiers, vec![(late_copier, 25)]);
    assert_eq!(reg.get(older).copiers, vec![(early_copier, 5)]);
    assert_eq!(reg.get(early_copier).copy_source, Some(older));
}

#[tokio::test]
async fn run_processes_a_plain_log_with_no_copies() {
    let mut scripts = HashMap::new();
    scripts.insert(("/trunk".to_string(), 0, 5), vec![entry(3, None), entry(5, None)]);
    let source = ScriptedSource { scripts };

    let mut reg = BranchRegistry::new();
    let trunk = reg.get_or_create("/trunk", 0);

    let mut planner = FetchPlanner::new(source, reg);
    planner.request(trunk, 5);
    planner.run().await.unwrap();

    let reg = planner.into_registry();
    assert_eq!(reg.get(trunk).pending.len(), 2);
    assert_eq!(reg.get(trunk).log_rev, 5);
    assert!(reg.get(trunk).cmt_log_finished);
}

#[tokio::test]
async fn run_advances_the_branchs_known_rev_as_entries_are_fetched() {
    let mut scripts = HashMap::new();
    scripts.insert(("/trunk".to_string(), 0, 5), vec![entry(3, None), entry(5, None)]);
    let source = ScriptedSource { scripts };

    let mut reg = BranchRegistry::new();
    let trunk = reg.get_or_create("/trunk", 0);

    let mut planner = FetchPlanner::new(source, reg);
    planner.request(trunk, 5);
    planner.run().await.unwrap();

    let reg = planner.into_registry();
    assert_eq!(reg.get(trunk).rev, 5);
}

#[tokio::test]
async fn handle_entry_discards_a_stray_duplicate_of_the_known_head_without_requesting_a_copysrc_log() {
    let source = ScriptedSource { scripts: HashMap::new() };
    let mut reg = BranchRegistry::new();
    let id = reg.get_or_create("/branches/x", 10);
    reg.get_mut(id).rev = 8;

    let mut planner = FetchPlanner::new(source, reg);
    planner.handle_entry(id, entry(8, None)).unwrap();

    let reg = planner.into_registry();
    assert!(!reg.get(id).need_copysrc_log);
    assert!(reg.get(id).pending.is_empty());
}

#[tokio::test]
async fn handle_entry_requests_a_copysrc_log_for_a_stray_entry_that_is_not_the_known_head() {
    let source = ScriptedSource { scripts: HashMap::new() };
    let mut reg = BranchRegistry::new();
    let id = reg.get_or_create("/branches/x", 10);
    reg.get_mut(id).rev = 8;

    let mut planner = FetchPlanner::new(source, reg);
    planner.handle_entry(id, entry(5, None)).unwrap();

    let reg = planner.into_registry();
    assert!(reg.get(id).need_copysrc_log);
    assert!(reg.get(id).pending.is_empty());
}

#[tokio::test]
async fn copy_source_entry_enqueues_a_log_request_against_the_source_branch() {
    let mut scripts = HashMap::new();
    scripts.insert(
        ("/branches/x".to_string(), 0, 10),
        vec![entry(10, Some(("/trunk", 7)))],
    );
    scripts.insert(("/trunk".to_string(), 0, 7), vec![entry(7, None)]);
    let source = ScriptedSource { scripts };

    let mut reg = BranchRegistry::new();
    let branch = reg.get_or_create("/branches/x", 0);

    let mut planner = FetchPlanner::new(source, reg);
    planner.request(branch, 10);
    planner.run().await.unwrap();

    let reg = planner.into_registry();
    let trunk = reg.by_path.get("/trunk").unwrap()[0];
    assert_eq!(reg.get(trunk).pending.len(), 1);
    assert_eq!(reg.get(branch).copy_source, Some(trunk));
    assert_eq!(reg.get(trunk).copiers, vec![(branch, 7)]);
}
