use super::*;
use std::io::Cursor;

#[tokio::test]
async fn reads_greeting_shape() {
    let msg = b"( 2 ( edit-pipeline svndiff1 ) 13:http://host/r 6:gsvn/1 ( ) ) ";
    let mut r = SexprReader::new(Cursor::new(msg.to_vec()));
    r.read_list().await.unwrap();
    assert_eq!(r.read_number().await.unwrap(), 2);
    r.read_list().await.unwrap();
    assert_eq!(r.read_atom().await.unwrap(), "edit-pipeline");
    assert_eq!(r.read_atom().await.unwrap(), "svndiff1");
    r.read_end().await.unwrap();
    assert_eq!(r.read_string().await.unwrap(), b"http://host/r");
    assert_eq!(r.read_string().await.unwrap(), b"gsvn/1");
    r.read_list().await.unwrap();
    assert!(!r.read_optional().await.unwrap());
    r.read_end().await.unwrap();
}

#[tokio::test]
async fn read_optional_leaves_stream_positioned_when_present() {
    let mut r = SexprReader::new(Cursor::new(b"5:hello)".to_vec()));
    assert!(r.read_optional().await.unwrap());
    assert_eq!(r.read_string().await.unwrap(), b"hello");
}

#[tokio::test]
async fn read_end_skips_nested_lists_and_strings_containing_parens() {
    // a tail the reader doesn't understand, including a string payload
    // that itself contains unbalanced parens — must not confuse the
    // paren-balancing skip since strings are length-counted first.
    let mut r = SexprReader::new(Cursor::new(b"atom 1 ( 2 3:(() ) ) ) rest".to_vec()));
    r.read_end().await.unwrap();
    assert_eq!(r.read_atom().await.unwrap(), "rest");
}

#[tokio::test]
async fn round_trips_list_number_atom_string() {
    let mut buf = Vec::new();
    {
        let mut w = SexprWriter::new(&mut buf);
        w.write_list().await.unwrap();
        w.write_number(42).await.unwrap();
        w.write_atom("check-path").await.unwrap();
        w.write_string(b"trunk/foo").await.unwrap();
        w.write_list_end().await.unwrap();
    }
    let mut r = SexprReader::new(Cursor::new(buf));
    r.read_list().await.unwrap();
    assert_eq!(r.read_number().await.unwrap(), 42);
    assert_eq!(r.read_atom().await.unwrap(), "check-path");
    assert_eq!(r.read_string().await.unwrap(), b"trunk/foo");
    r.read_end().await.unwrap();
}

#[tokio::test]
async fn rejects_list_close_where_list_open_expected() {
    let mut r = SexprReader::new(Cursor::new(b") ".to_vec()));
    assert!(r.read_list().await.is_err());
}

#[tokio::test]
async fn peek_is_list_does_not_consume() {
    let mut r = SexprReader::new(Cursor::new(b"( 1 ) done ".to_vec()));
    assert!(r.peek_is_list().await.unwrap());
    r.read_list().await.unwrap();
    assert_eq!(r.read_number().await.unwrap(), 1);
    r.read_end().await.unwrap();
    assert!(!r.peek_is_list().await.unwrap());
    assert_eq!(r.read_atom().await.unwrap(), "done");
}

#[tokio::test]
async fn string_payload_may_contain_any_byte() {
    let payload = vec![b'(', b')', 0u8, b' ', b'\n'];
    let mut buf = Vec::new();
    SexprWriter::new(&mut buf).write_string(&payload).await.unwrap();
    let mut r = SexprReader::new(Cursor::new(buf));
    assert_eq!(r.read_string().await.unwrap(), payload);
}
