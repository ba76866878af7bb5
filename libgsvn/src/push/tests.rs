use super::*;
use crate::adapters::{Commit, InMemoryRepo, ObjectStore};
use crate::protocol::EditorSource;
use chrono::Utc;

async fn commit(repo: &InMemoryRepo, tree: Oid, parents: Vec<Oid>) -> Oid {
    repo.write_commit(&Commit {
        tree,
        parents,
        author: "a".into(),
        committer: "a".into(),
        date: Utc::now(),
        message: "m".into(),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn classify_marks_a_linear_chain_first_parent_down_to_the_existing_head() {
    let repo = InMemoryRepo::new();
    let base = commit(&repo, NULL_OID, vec![]).await;
    let mid = commit(&repo, NULL_OID, vec![base]).await;
    let tip = commit(&repo, NULL_OID, vec![mid]).await;

    let mut planner = PushPlanner::new(&repo);
    planner.seed_existing_head(base);
    planner.seed_push_target(
        tip,
        PushTarget { svn_path: "/trunk".to_string(), is_tag: false, replace: false },
        true,
    );
    planner.classify(&[base, tip]).await.unwrap();

    assert_eq!(planner.classification_of(tip), Some(CommitType::FirstParent));
    assert_eq!(planner.classification_of(mid), Some(CommitType::FirstParent));
    assert_eq!(planner.classification_of(base), Some(CommitType::SvnCmt));

    let chain = planner.chain_to_push(tip).await.unwrap();
    assert_eq!(chain, vec![mid, tip]);
}

#[tokio::test]
async fn classify_marks_non_first_parents_as_second_parent_and_excludes_them_from_the_chain() {
    let repo = InMemoryRepo::new();
    let base = commit(&repo, NULL_OID, vec![]).await;
    let side = commit(&repo, NULL_OID, vec![base]).await;
    let merge = commit(&repo, NULL_OID, vec![base, side]).await;

    let mut planner = PushPlanner::new(&repo);
    planner.seed_existing_head(base);
    planner.seed_push_target(
        merge,
        PushTarget { svn_path: "/trunk".to_string(), is_tag: false, replace: false },
        true,
    );
    planner.classify(&[base, merge]).await.unwrap();

    assert_eq!(planner.classification_of(side), Some(CommitType::SecondParent));
    let chain = planner.chain_to_push(merge).await.unwrap();
    assert_eq!(chain, vec![merge]);
}

#[tokio::test]
async fn seed_push_target_without_an_existing_branch_classifies_first_parent_new() {
    let repo = InMemoryRepo::new();
    let tip = commit(&repo, NULL_OID, vec![]).await;

    let mut planner = PushPlanner::new(&repo);
    planner.seed_push_target(
        tip,
        PushTarget { svn_path: "/branches/x".to_string(), is_tag: false, replace: false },
        false,
    );
    planner.classify(&[tip]).await.unwrap();

    assert_eq!(planner.classification_of(tip), Some(CommitType::FirstParentNew));
}

#[tokio::test]
async fn insert_never_downgrades_an_existing_classification() {
    let repo = InMemoryRepo::new();
    let tip = commit(&repo, NULL_OID, vec![]).await;

    let mut planner = PushPlanner::new(&repo);
    planner.seed_existing_head(tip);
    planner.seed_push_target(
        tip,
        PushTarget { svn_path: "/trunk".to_string(), is_tag: false, replace: false },
        true,
    );

    assert_eq!(planner.classification_of(tip), Some(CommitType::SvnCmt));
}

#[tokio::test]
async fn diff_editor_source_emits_add_file_for_a_brand_new_tree() {
    let repo = InMemoryRepo::new();
    let oid = repo.write_blob(b"hi").await.unwrap();
    let tree = repo
        .write_tree(&Tree { entries: vec![TreeEntry { name: "a.txt".into(), oid, is_tree: false, is_executable: false }] })
        .await
        .unwrap();

    let mut source = DiffEditorSource::new(&repo, NULL_OID, tree).await.unwrap();
    let mut ops = Vec::new();
    while let Some(op) = source.next_op().await.unwrap() {
        ops.push(op);
    }

    assert!(matches!(&ops[0], EditorOp::AddFile { path } if path == "a.txt"));
    assert!(matches!(&ops[1], EditorOp::ApplyTextDelta { .. }));
    assert!(matches!(&ops[2], EditorOp::CloseFile));
}

#[tokio::test]
async fn diff_editor_source_emits_delete_entry_for_a_removed_file() {
    let repo = InMemoryRepo::new();
    let oid = repo.write_blob(b"hi").await.unwrap();
    let old_tree = repo
        .write_tree(&Tree { entries: vec![TreeEntry { name: "a.txt".into(), oid, is_tree: false, is_executable: false }] })
        .await
        .unwrap();

    let mut source = DiffEditorSource::new(&repo, old_tree, NULL_OID).await.unwrap();
    let op = source.next_op().await.unwrap().unwrap();
    assert!(matches!(op, EditorOp::DeleteEntry { path } if path == "a.txt"));
}

#[tokio::test]
async fn diff_editor_source_skips_unchanged_entries() {
    let repo = InMemoryRepo::new();
    let oid = repo.write_blob(b"hi").await.unwrap();
    let tree = repo
        .write_tree(&Tree { entries: vec![TreeEntry { name: "a.txt".into(), oid, is_tree: false, is_executable: false }] })
        .await
        .unwrap();

    let mut source = DiffEditorSource::new(&repo, tree, tree).await.unwrap();
    assert!(source.next_op().await.unwrap().is_none());
}

#[tokio::test]
async fn copy_editor_source_emits_a_single_add_dir_with_copy_from() {
    let mut source = CopyEditorSource::new("tags/v1".to_string(), "trunk".to_string(), 9);
    let op = source.next_op().await.unwrap().unwrap();
    assert!(matches!(op, EditorOp::AddDir { path, copy_from: Some((from, rev)) }
        if path == "tags/v1" && from == "trunk" && rev == 9));
    assert!(source.next_op().await.unwrap().is_none());
}

#[tokio::test]
async fn plan_commit_kinds_marks_the_first_entry_of_a_new_branch_add() {
    let repo = InMemoryRepo::new();
    let base = commit(&repo, NULL_OID, vec![]).await;
    let tip = commit(&repo, NULL_OID, vec![base]).await;

    let mut planner = PushPlanner::new(&repo);
    planner.seed_push_target(
        tip,
        PushTarget { svn_path: "/branches/x".to_string(), is_tag: false, replace: false },
        false,
    );
    planner.classify(&[tip]).await.unwrap();

    let plan = planner.plan_commit_kinds(tip, false, false, None, false).await.unwrap();
    assert_eq!(plan, vec![(base, OperationKind::Add), (tip, OperationKind::Modify)]);
}

#[tokio::test]
async fn plan_commit_kinds_is_modify_for_a_plain_fast_forward_onto_the_server_head() {
    let repo = InMemoryRepo::new();
    let base = commit(&repo, NULL_OID, vec![]).await;
    let tip = commit(&repo, NULL_OID, vec![base]).await;

    let mut planner = PushPlanner::new(&repo);
    planner.seed_existing_head(base);
    planner.seed_push_target(
        tip,
        PushTarget { svn_path: "/trunk".to_string(), is_tag: false, replace: false },
        true,
    );
    planner.classify(&[base, tip]).await.unwrap();

    let plan = planner.plan_commit_kinds(tip, true, false, Some(base), false).await.unwrap();
    assert_eq!(plan, vec![(tip, OperationKind::Modify)]);
}

#[tokio::test]
async fn plan_commit_kinds_is_replace_when_force_is_set() {
    let repo = InMemoryRepo::new();
    let base = commit(&repo, NULL_OID, vec![]).await;
    let tip = commit(&repo, NULL_OID, vec![base]).await;

    let mut planner = PushPlanner::new(&repo);
    planner.seed_existing_head(base);
    planner.seed_push_target(
        tip,
        PushTarget { svn_path: "/trunk".to_string(), is_tag: false, replace: false },
        true,
    );
    planner.classify(&[base, tip]).await.unwrap();

    let plan = planner.plan_commit_kinds(tip, true, true, Some(base), false).await.unwrap();
    assert_eq!(plan, vec![(tip, OperationKind::Replace)]);
}

#[tokio::test]
async fn plan_commit_kinds_is_replace_when_the_first_parent_has_drifted_from_the_server_head() {
    let repo = InMemoryRepo::new();
    let base = commit(&repo, NULL_OID, vec![]).await;
    let diverged_base = commit(&repo, NULL_OID, vec![]).await;
    let tip = commit(&repo, NULL_OID, vec![diverged_base]).await;

    let mut planner = PushPlanner::new(&repo);
    planner.seed_existing_head(diverged_base);
    planner.seed_push_target(
        tip,
        PushTarget { svn_path: "/trunk".to_string(), is_tag: false, replace: false },
        true,
    );
    planner.classify(&[diverged_base, tip]).await.unwrap();

    // the server head passed in (`base`) doesn't match `tip`'s actual first
    // parent (`diverged_base`), simulating a server head the caller
    // observed that has since moved
    let plan = planner.plan_commit_kinds(tip, true, false, Some(base), false).await.unwrap();
    assert_eq!(plan, vec![(tip, OperationKind::Replace)]);
}

#[tokio::test]
async fn plan_commit_kinds_is_replace_when_an_intermediate_revision_touched_the_branch() {
    let repo = InMemoryRepo::new();
    let base = commit(&repo, NULL_OID, vec![]).await;
    let tip = commit(&repo, NULL_OID, vec![base]).await;

    let mut planner = PushPlanner::new(&repo);
    planner.seed_existing_head(base);
    planner.seed_push_target(
        tip,
        PushTarget { svn_path: "/trunk".to_string(), is_tag: false, replace: false },
        true,
    );
    planner.classify(&[base, tip]).await.unwrap();

    let plan = planner.plan_commit_kinds(tip, true, false, Some(base), true).await.unwrap();
    assert_eq!(plan, vec![(tip, OperationKind::Replace)]);
}

#[tokio::test]
async fn delete_editor_source_emits_a_single_delete_entry() {
    let mut source = DeleteEditorSource::new("/branches/x".to_string());
    let op = source.next_op().await.unwrap().unwrap();
    assert!(matches!(op, EditorOp::DeleteEntry { path } if path == "/branches/x"));
    assert!(source.next_op().await.unwrap().is_none());
}

#[test]
fn check_no_intermediate_commits_rejects_a_moved_server_without_force() {
    assert!(check_no_intermediate_commits("/trunk", 5, 7, false).is_err());
    assert!(check_no_intermediate_commits("/trunk", 5, 7, true).is_ok());
    assert!(check_no_intermediate_commits("/trunk", 5, 5, false).is_ok());
}
