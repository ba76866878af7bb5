use super::*;
use crate::model::Credential;
use std::io::Cursor;
use tokio::io::{duplex, AsyncWriteExt};

/// spawns a task that writes `script` to `server_side` and then leaves the
/// half open (the client under test never needs to read past what it asks
/// for, and duplex buffering means the writer doesn't need to interleave
/// with the client's own writes).
fn serve(mut server_side: tokio::io::DuplexStream, script: &'static [u8]) {
    tokio::spawn(async move {
        let _ = server_side.write_all(script).await;
    });
}

#[tokio::test]
async fn connect_and_core_ops_round_trip_against_a_scripted_server() {
    let script: &'static [u8] = concat!(
        "( success ( 2 2 ) ) ",                                        // server hello
        "( success ( ( ANONYMOUS ) 5:realm ) ) ",                      // mechs
        "( success ( ) ) ",                                            // anon auth ack
        "( success ( 6:uuid-1 8:http://x ) ) ",                        // repo-info
        "( success ( ) ) ",                                            // reparent ack 1
        "( success ( ) ) ",                                            // reparent ack 2
        "( success ( ) ) ",                                            // get-latest-rev ack
        "( success ( 42 ) ) ",                                         // get-latest-rev data
        "( success ( ) ) ",                                            // check-path ack
        "( success ( dir ) ) ",                                        // check-path data
        "( success ( ) ) ",                                            // get-dir ack
        "( success ( 3 ( ) ( ( 3:foo dir ) ( 3:bar file ) ) ) ) ",      // get-dir data
        "( success ( ) ) ",                                            // log ack
        "( ( ( 8:/trunk/a A ) ) 5 ( 5:alice ) ( 20:2024-01-01T00:00:00Z ) ( 7:msg-one ) ) ",
        "done ",
        "( success ( ) ) ",                                            // log done-ack
    )
    .as_bytes();

    let (client_side, server_side) = duplex(16 * 1024);
    serve(server_side, script);

    let credential = Credential::default();
    let mut client = Client::connect(client_side, "svn://host/repo/trunk", &credential)
        .await
        .expect("handshake should succeed");
    assert_eq!(client.repo_uuid(), "uuid-1");
    assert_eq!(client.repo_root(), "http://x");

    assert_eq!(client.get_latest_rev().await.unwrap(), 42);
    assert_eq!(client.check_path("trunk", None).await.unwrap(), NodeKind::Dir);

    let entries = client.get_dir("trunk", None).await.unwrap();
    assert_eq!(
        entries,
        vec![("foo".to_string(), NodeKind::Dir), ("bar".to_string(), NodeKind::File)]
    );

    let log = client
        .log(&["/trunk".to_string()], 1, 5, true)
        .await
        .unwrap();
    assert_eq!(log.len(), 1);
    let entry = &log[0];
    assert_eq!(entry.rev, 5);
    assert_eq!(entry.author.as_deref(), Some("alice"));
    assert_eq!(entry.message, "msg-one");
    assert_eq!(entry.changed_paths.len(), 1);
    assert_eq!(entry.changed_paths[0].path, "/trunk/a");
    assert_eq!(entry.changed_paths[0].kind, ChangeKind::Add);
}

#[tokio::test]
async fn connect_fails_when_server_rejects_version() {
    let script: &'static [u8] = b"( success ( 9 9 ) ) ";
    let (client_side, server_side) = duplex(4096);
    serve(server_side, script);

    let credential = Credential::default();
    let err = Client::connect(client_side, "svn://host/repo", &credential).await.unwrap_err();
    assert!(matches!(err, GsvnError::Protocol(_)));
}

#[tokio::test]
async fn get_latest_rev_surfaces_server_failure() {
    let script: &'static [u8] = concat!(
        "( success ( 2 2 ) ) ",
        "( success ( ( ANONYMOUS ) 5:realm ) ) ",
        "( success ( ) ) ",
        "( success ( 6:uuid-1 8:http://x ) ) ",
        "( success ( ) ) ",
        "( success ( ) ) ",
        "( failure ( ( 160013 11:not found! ) ) ) ",
    )
    .as_bytes();
    let (client_side, server_side) = duplex(16 * 1024);
    serve(server_side, script);

    let credential = Credential::default();
    let mut client = Client::connect(client_side, "svn://host/repo", &credential).await.unwrap();
    let err = client.get_latest_rev().await.unwrap_err();
    assert!(matches!(err, GsvnError::ServerFailure(_)));
}

#[tokio::test]
async fn authenticate_cram_md5_round_trips_challenge_response() {
    let script: &'static [u8] = concat!(
        "( success ( ( CRAM-MD5 ) 5:realm ) ) ",
        "( step ( 8:abcdefgh ) ) ",
        "( success ( ) ) ",
    )
    .as_bytes();
    let (client_side, server_side) = duplex(4096);
    serve(server_side, script);

    let (rh, wh) = tokio::io::split(client_side);
    let mut rd = SexprReader::new(rh);
    let mut wr = SexprWriter::new(wh);
    let credential = Credential {
        username: Some("alice".to_string()),
        password: Some("hunter2".to_string()),
    };
    authenticate(&mut rd, &mut wr, &credential).await.unwrap();
}

#[tokio::test]
async fn read_log_entry_with_copy_source_parses_the_copy_sublist() {
    let msg = concat!(
        "( ( ( 9:/branch/b R ( 8:/trunk/b 4 ) ) ) 9 ( 5:carol ) ",
        "( 20:2024-02-02T00:00:00Z ) ( 6:branch ) ) ",
    )
    .as_bytes();
    let mut rd = SexprReader::new(Cursor::new(msg.to_vec()));
    let entry = read_log_entry(&mut rd, true).await.unwrap();
    assert_eq!(entry.changed_paths.len(), 1);
    let cp = &entry.changed_paths[0];
    assert_eq!(cp.path, "/branch/b");
    assert_eq!(cp.kind, ChangeKind::Replace);
    assert_eq!(cp.copy_source, Some(("/trunk/b".to_string(), 4)));
    assert_eq!(entry.copy_source, Some(("/trunk/b".to_string(), 4)));
}

#[tokio::test]
async fn read_log_entry_without_changed_paths_reads_empty_list() {
    let msg = b"( ( ) 7 ( 3:bob ) ( 20:2024-06-01T00:00:00Z ) ( 4:oops ) ) ";
    let mut rd = SexprReader::new(Cursor::new(msg.to_vec()));
    let entry = read_log_entry(&mut rd, false).await.unwrap();
    assert_eq!(entry.rev, 7);
    assert_eq!(entry.author.as_deref(), Some("bob"));
    assert_eq!(entry.message, "oops");
    assert!(entry.changed_paths.is_empty());
}
