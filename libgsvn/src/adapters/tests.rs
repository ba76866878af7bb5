use super::*;

#[tokio::test]
async fn write_then_read_blob_round_trips() {
    let repo = InMemoryRepo::new();
    let oid = repo.write_blob(b"hello").await.unwrap();
    assert_eq!(repo.read_blob(oid).await.unwrap(), b"hello");
}

#[tokio::test]
async fn ref_update_rejects_stale_expected_value() {
    let repo = InMemoryRepo::new();
    let a = repo.write_blob(b"a").await.unwrap();
    let b = repo.write_blob(b"b").await.unwrap();
    repo.update("refs/svn/x", None, a).await.unwrap();
    let err = repo.update("refs/svn/x", None, b).await.unwrap_err();
    assert!(matches!(err, crate::error::GsvnError::Conflict { .. }));
    repo.update("refs/svn/x", Some(a), b).await.unwrap();
    assert_eq!(repo.read("refs/svn/x").await.unwrap(), Some(b));
}

#[tokio::test]
async fn index_checkout_and_write_tree_round_trips_a_nested_layout() {
    let repo = InMemoryRepo::new();
    let a = repo.write_blob(b"trunk file a").await.unwrap();
    let b = repo.write_blob(b"nested file b").await.unwrap();
    repo.set("a.txt", a, false).await.unwrap();
    repo.set("dir/b.txt", b, true).await.unwrap();

    let tree_oid = Index::write_tree(&repo, &repo).await.unwrap();

    repo.clear().await.unwrap();
    assert!(repo.get("a.txt").await.unwrap().is_none());

    repo.checkout_tree(tree_oid, &repo).await.unwrap();
    assert_eq!(repo.get("a.txt").await.unwrap(), Some((a, false)));
    assert_eq!(repo.get("dir/b.txt").await.unwrap(), Some((b, true)));
}

#[tokio::test]
async fn remove_prefixed_clears_a_whole_subtree_but_not_siblings() {
    let repo = InMemoryRepo::new();
    let oid = repo.write_blob(b"x").await.unwrap();
    repo.set("dir/a", oid, false).await.unwrap();
    repo.set("dir/sub/b", oid, false).await.unwrap();
    repo.set("dirsibling", oid, false).await.unwrap();

    repo.remove_prefixed("dir").await.unwrap();

    assert!(repo.get("dir/a").await.unwrap().is_none());
    assert!(repo.get("dir/sub/b").await.unwrap().is_none());
    assert_eq!(repo.get("dirsibling").await.unwrap(), Some((oid, false)));
}
