//! The `ra_svn` wire protocol client (C3): connection handshake, SASL
//! authentication, the typed request/response operations, and the editor
//! command stream shared by `update`/`commit`.
//!
//! Every request made after the handshake gets back *two* replies: a
//! generic ack (`(success (...))`, body don't-care) followed by the reply
//! that actually carries the operation's data. [`read_ack`] consumes the
//! first; [`open_reply`] opens the second, leaving the caller to read its
//! fields and close it with two [`SexprReader::read_end`] calls.

use crate::delta::Delta;
use crate::error::{GsvnError, GsvnResult, ServerFailure};
use crate::model::{ChangeKind, ChangedPath, CommitInfo, Credential, LogEntry, NodeKind, Revision};
use crate::sexpr::{SexprReader, SexprWriter};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::{debug, trace};
use md5::Md5;
use tokio::io::{split, AsyncRead, AsyncWrite, ReadHalf, WriteHalf};

/// the single major protocol version this client negotiates
const SUPPORTED_VERSION: u64 = 2;

pub struct Client<IO> {
    rd: SexprReader<ReadHalf<IO>>,
    wr: SexprWriter<WriteHalf<IO>>,
    repo_uuid: String,
    repo_root: String,
}

impl<IO: AsyncRead + AsyncWrite + Unpin + Send> Client<IO> {
    /// runs the connection handshake: client greeting, server hello,
    /// mechanism negotiation, auth, repo-info, and a final reparent onto
    /// `url` so the session's root matches the path the caller asked for
    pub async fn connect(io: IO, url: &str, credential: &Credential) -> GsvnResult<Self> {
        trace!("connecting to {}", url);
        let (rh, wh) = split(io);
        let mut rd = SexprReader::new(rh);
        let mut wr = SexprWriter::new(wh);

        wr.write_list().await?;
        wr.write_number(SUPPORTED_VERSION).await?;
        wr.write_list().await?;
        wr.write_atom("edit-pipeline").await?;
        wr.write_atom("svndiff1").await?;
        wr.write_list_end().await?;
        wr.write_string(url.as_bytes()).await?;
        wr.write_string(b"gsvn").await?;
        wr.write_list().await?;
        wr.write_list_end().await?;
        wr.write_list_end().await?;

        // server hello: ( success ( minver maxver ) )
        rd.read_list().await?;
        assert_success(&mut rd).await?;
        rd.read_list().await?;
        let minver = rd.read_number().await?;
        let maxver = rd.read_number().await?;
        if minver > SUPPORTED_VERSION || maxver < SUPPORTED_VERSION {
            return Err(GsvnError::protocol(format!(
                "server supports versions {}..{}, need {}",
                minver, maxver, SUPPORTED_VERSION
            )));
        }
        rd.read_end().await?;
        rd.read_end().await?;

        // server mechs + auth exchange: ( success ( ( mech... ) realm ) )
        authenticate(&mut rd, &mut wr, credential).await?;

        // repo-info: ( success ( uuid repos-url ) )
        rd.read_list().await?;
        assert_success(&mut rd).await?;
        rd.read_list().await?;
        let repo_uuid = String::from_utf8(rd.read_string().await?)
            .map_err(|_| GsvnError::protocol("non-utf8 repository uuid"))?;
        let repo_root = String::from_utf8(rd.read_string().await?)
            .map_err(|_| GsvnError::protocol("non-utf8 repository root"))?;
        rd.read_end().await?;
        rd.read_end().await?;

        // reparent onto the same url; the server acks with two replies,
        // same as every other post-handshake command
        wr.write_list().await?;
        wr.write_atom("reparent").await?;
        wr.write_list().await?;
        wr.write_string(url.as_bytes()).await?;
        wr.write_list_end().await?;
        wr.write_list_end().await?;
        read_ack(&mut rd).await?;
        read_ack(&mut rd).await?;

        debug!("connected to {} (uuid {})", repo_root, repo_uuid);
        Ok(Self { rd, wr, repo_uuid, repo_root })
    }

    pub fn repo_uuid(&self) -> &str {
        &self.repo_uuid
    }

    pub fn repo_root(&self) -> &str {
        &self.repo_root
    }

    pub async fn get_latest_rev(&mut self) -> GsvnResult<Revision> {
        trace!("get-latest-rev");
        self.wr.write_list().await?;
        self.wr.write_atom("get-latest-rev").await?;
        self.wr.write_list().await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;

        read_ack(&mut self.rd).await?;
        open_reply(&mut self.rd).await?;
        let rev = self.rd.read_number().await?;
        self.rd.read_end().await?;
        self.rd.read_end().await?;
        Ok(rev)
    }

    pub async fn check_path(&mut self, path: &str, rev: Option<Revision>) -> GsvnResult<NodeKind> {
        self.wr.write_list().await?;
        self.wr.write_atom("check-path").await?;
        self.wr.write_list().await?;
        self.wr.write_string(path.as_bytes()).await?;
        self.wr.write_list().await?;
        if let Some(rev) = rev {
            self.wr.write_number(rev).await?;
        }
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;

        read_ack(&mut self.rd).await?;
        open_reply(&mut self.rd).await?;
        let atom = self.rd.read_atom().await?;
        self.rd.read_end().await?;
        self.rd.read_end().await?;
        NodeKind::from_atom(&atom)
            .ok_or_else(|| GsvnError::protocol(format!("unknown node kind `{}`", atom)))
    }

    pub async fn get_dir(
        &mut self,
        path: &str,
        rev: Option<Revision>,
    ) -> GsvnResult<Vec<(String, NodeKind)>> {
        self.wr.write_list().await?;
        self.wr.write_atom("get-dir").await?;
        self.wr.write_list().await?;
        self.wr.write_string(path.as_bytes()).await?;
        self.wr.write_list().await?;
        if let Some(rev) = rev {
            self.wr.write_number(rev).await?;
        }
        self.wr.write_list_end().await?;
        self.wr.write_atom("false").await?; // want-props
        self.wr.write_atom("true").await?; // want-contents
        self.wr.write_list().await?;
        self.wr.write_atom("kind").await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;

        read_ack(&mut self.rd).await?;
        open_reply(&mut self.rd).await?;
        let _rev = self.rd.read_number().await?;
        self.rd.read_list().await?; // rev-props, always empty for us
        self.rd.read_end().await?;
        self.rd.read_list().await?; // dirents
        let mut entries = Vec::new();
        while self.rd.read_optional().await? {
            self.rd.read_list().await?;
            let name = String::from_utf8(self.rd.read_string().await?)
                .map_err(|_| GsvnError::protocol("non-utf8 dirent name"))?;
            let kind_atom = self.rd.read_atom().await?;
            let kind = NodeKind::from_atom(&kind_atom)
                .ok_or_else(|| GsvnError::protocol(format!("unknown node kind `{}`", kind_atom)))?;
            self.rd.read_end().await?;
            entries.push((name, kind));
        }
        self.rd.read_end().await?;
        self.rd.read_end().await?;
        Ok(entries)
    }

    /// issues `log` for `paths` over `[start, end]`, returning entries in
    /// the order the server sends them. the reply is a stream of bare
    /// entry tuples terminated by the literal atom `done`, not a list.
    pub async fn log(
        &mut self,
        paths: &[String],
        start: Revision,
        end: Revision,
        changed_paths: bool,
    ) -> GsvnResult<Vec<LogEntry>> {
        trace!("log {:?} r{}..r{}", paths, start, end);
        self.wr.write_list().await?;
        self.wr.write_atom("log").await?;
        self.wr.write_list().await?;
        self.wr.write_list().await?;
        for path in paths {
            self.wr.write_string(path.as_bytes()).await?;
        }
        self.wr.write_list_end().await?;
        self.wr.write_list().await?;
        self.wr.write_number(start).await?;
        self.wr.write_list_end().await?;
        self.wr.write_list().await?;
        self.wr.write_number(end).await?;
        self.wr.write_list_end().await?;
        self.wr.write_atom(if changed_paths { "true" } else { "false" }).await?;
        self.wr.write_atom("true").await?; // strict-node
        self.wr.write_number(0).await?; // limit: unbounded
        self.wr.write_atom("false").await?; // include-merged-revisions
        self.wr.write_list().await?;
        self.wr.write_list_end().await?;
        self.wr.write_list().await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;

        read_ack(&mut self.rd).await?;

        let mut entries = Vec::new();
        loop {
            if !self.rd.peek_is_list().await? {
                let tag = self.rd.read_atom().await?;
                if tag != "done" {
                    return Err(GsvnError::protocol(format!("expected `done`, got `{}`", tag)));
                }
                read_ack(&mut self.rd).await?;
                break;
            }
            entries.push(read_log_entry(&mut self.rd, changed_paths).await?);
        }
        Ok(entries)
    }

    /// `update`/`set-path`/`finish-report`: requests the full tree as of
    /// `rev` under `path` and drives the resulting editor stream into
    /// `sink`. Reports a single root `set-path` with `start-empty` set
    /// rather than an incremental report against a prior working state,
    /// since this crate always materialises each revision independently
    /// (C7) instead of keeping a persistent working copy to report
    /// against — the server sends a full add-dir/add-file tree either
    /// way, just as a first checkout would.
    pub async fn update(&mut self, path: &str, rev: Revision, sink: &mut impl EditorSink) -> GsvnResult<()> {
        trace!("update {} @r{}", path, rev);
        self.wr.write_list().await?;
        self.wr.write_atom("update").await?;
        self.wr.write_list().await?;
        self.wr.write_list().await?;
        self.wr.write_number(rev).await?;
        self.wr.write_list_end().await?;
        self.wr.write_string(path.as_bytes()).await?;
        self.wr.write_atom("true").await?; // recurse
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;
        read_ack(&mut self.rd).await?;

        self.wr.write_list().await?;
        self.wr.write_atom("set-path").await?;
        self.wr.write_list().await?;
        self.wr.write_string(b"").await?;
        self.wr.write_number(rev).await?;
        self.wr.write_atom("true").await?; // start-empty
        self.wr.write_list().await?;
        self.wr.write_list_end().await?; // no lock token
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;
        read_ack(&mut self.rd).await?;

        self.wr.write_list().await?;
        self.wr.write_atom("finish-report").await?;
        self.wr.write_list().await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;
        read_ack(&mut self.rd).await?;

        self.drive_update(sink).await
    }

    /// drives the receive-side editor loop until `close-edit`, feeding
    /// each command to `sink`
    pub async fn drive_update(&mut self, sink: &mut impl EditorSink) -> GsvnResult<()> {
        loop {
            self.rd.read_list().await?;
            let cmd = self.rd.read_atom().await?;
            if cmd == "close-edit" {
                self.rd.read_end().await?;
                self.rd.read_end().await?;
                return Ok(());
            }
            self.dispatch_editor_command(&cmd, sink).await?;
            self.rd.read_end().await?;
        }
    }

    async fn dispatch_editor_command(
        &mut self,
        cmd: &str,
        sink: &mut impl EditorSink,
    ) -> GsvnResult<()> {
        self.rd.read_list().await?;
        match cmd {
            "add-dir" => {
                let path = read_path(&mut self.rd).await?;
                self.rd.read_end().await?;
                sink.add_dir(&path).await?;
            }
            "open-dir" => {
                let path = read_path(&mut self.rd).await?;
                self.rd.read_end().await?;
                sink.open_dir(&path).await?;
            }
            "delete-entry" => {
                let path = read_path(&mut self.rd).await?;
                self.rd.read_end().await?;
                sink.delete_entry(&path).await?;
            }
            "add-file" | "open-file" => {
                let path = read_path(&mut self.rd).await?;
                self.rd.read_end().await?;
                if cmd == "add-file" {
                    sink.add_file(&path).await?;
                } else {
                    sink.open_file(&path).await?;
                }
            }
            "apply-textdelta" => {
                self.rd.read_end().await?;
                sink.begin_textdelta().await?;
            }
            "textdelta-chunk" => {
                let chunk = self.rd.read_string().await?;
                self.rd.read_end().await?;
                sink.textdelta_chunk(&chunk).await?;
            }
            "textdelta-end" => {
                self.rd.read_end().await?;
                sink.end_textdelta().await?;
            }
            "close-file" => {
                self.rd.read_end().await?;
                sink.close_file().await?;
            }
            "close-dir" => {
                self.rd.read_end().await?;
                sink.close_dir().await?;
            }
            // unknown commands are skipped with read-end, not fatal
            _ => {
                self.rd.read_end().await?;
            }
        }
        Ok(())
    }

    /// symmetric editor drive for `commit`: `source` emits write-side ops
    /// until exhausted, then the client reads `commit-info`
    pub async fn commit(
        &mut self,
        log_message: &str,
        source: &mut impl EditorSource,
    ) -> GsvnResult<CommitInfo> {
        trace!("commit: {:?}", log_message);
        self.wr.write_list().await?;
        self.wr.write_atom("commit").await?;
        self.wr.write_list().await?;
        self.wr.write_string(log_message.as_bytes()).await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;

        read_ack(&mut self.rd).await?;

        while let Some(op) = source.next_op().await? {
            self.write_editor_op(&op).await?;
        }
        self.wr.write_list().await?;
        self.wr.write_atom("close-edit").await?;
        self.wr.write_list().await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;

        // ( success ( rev date ( author ) ) )
        self.rd.read_list().await?;
        assert_success(&mut self.rd).await?;
        self.rd.read_list().await?;
        let rev = self.rd.read_number().await?;
        let date_str = self.rd.read_string().await?;
        let date = String::from_utf8(date_str)
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|d| d.with_timezone(&Utc))
            .ok_or_else(|| GsvnError::protocol("malformed commit-info date"))?;
        let author = if self.rd.read_optional().await? {
            Some(
                String::from_utf8(self.rd.read_string().await?)
                    .map_err(|_| GsvnError::protocol("non-utf8 author"))?,
            )
        } else {
            None
        };
        self.rd.read_end().await?;
        self.rd.read_end().await?;

        debug!("committed r{}", rev);
        Ok(CommitInfo { rev, date, author })
    }

    async fn write_editor_op(&mut self, op: &EditorOp) -> GsvnResult<()> {
        match op {
            EditorOp::AddDir { path, copy_from } => {
                self.wr.write_list().await?;
                self.wr.write_atom("add-dir").await?;
                self.wr.write_list().await?;
                self.wr.write_string(path.as_bytes()).await?;
                self.wr.write_list().await?;
                if let Some((from_path, from_rev)) = copy_from {
                    self.wr.write_string(from_path.as_bytes()).await?;
                    self.wr.write_number(*from_rev).await?;
                }
                self.wr.write_list_end().await?;
                self.wr.write_list_end().await?;
                self.wr.write_list_end().await?;
            }
            EditorOp::OpenDir { path } => {
                self.write_path_op("open-dir", path).await?;
            }
            EditorOp::DeleteEntry { path } => {
                self.write_path_op("delete-entry", path).await?;
            }
            EditorOp::AddFile { path } => {
                self.write_path_op("add-file", path).await?;
            }
            EditorOp::OpenFile { path } => {
                self.write_path_op("open-file", path).await?;
            }
            EditorOp::ApplyTextDelta { content } => {
                self.wr.write_list().await?;
                self.wr.write_atom("apply-textdelta").await?;
                self.wr.write_list().await?;
                self.wr.write_list_end().await?;
                self.wr.write_list_end().await?;

                let encoded = Delta::encode(content, true)?;
                for chunk in encoded.chunks(32 * 1024) {
                    self.wr.write_list().await?;
                    self.wr.write_atom("textdelta-chunk").await?;
                    self.wr.write_list().await?;
                    self.wr.write_string(chunk).await?;
                    self.wr.write_list_end().await?;
                    self.wr.write_list_end().await?;
                }
                self.wr.write_list().await?;
                self.wr.write_atom("textdelta-end").await?;
                self.wr.write_list().await?;
                self.wr.write_list_end().await?;
                self.wr.write_list_end().await?;
            }
            EditorOp::CloseFile => {
                self.wr.write_list().await?;
                self.wr.write_atom("close-file").await?;
                self.wr.write_list().await?;
                self.wr.write_list_end().await?;
                self.wr.write_list_end().await?;
            }
            EditorOp::CloseDir => {
                self.wr.write_list().await?;
                self.wr.write_atom("close-dir").await?;
                self.wr.write_list().await?;
                self.wr.write_list_end().await?;
                self.wr.write_list_end().await?;
            }
        }
        Ok(())
    }

    async fn write_path_op(&mut self, atom: &str, path: &str) -> GsvnResult<()> {
        self.wr.write_list().await?;
        self.wr.write_atom(atom).await?;
        self.wr.write_list().await?;
        self.wr.write_string(path.as_bytes()).await?;
        self.wr.write_list_end().await?;
        self.wr.write_list_end().await?;
        Ok(())
    }
}

async fn assert_success<R: AsyncRead + Unpin>(rd: &mut SexprReader<R>) -> GsvnResult<()> {
    let tag = rd.read_atom().await?;
    if tag == "failure" {
        return Err(read_failure(rd).await?.into());
    }
    if tag != "success" {
        return Err(GsvnError::protocol(format!("expected `success`, got `{}`", tag)));
    }
    Ok(())
}

/// consumes one entire `(tag (...))` reply whose body is don't-care: the
/// generic ack every post-handshake command gets before its data reply
async fn read_ack<R: AsyncRead + Unpin>(rd: &mut SexprReader<R>) -> GsvnResult<()> {
    rd.read_list().await?;
    assert_success(rd).await?;
    rd.read_list().await?;
    rd.read_end().await?;
    rd.read_end().await?;
    Ok(())
}

/// opens a `(tag (` reply, leaving the caller to read its fields and
/// close both levels with two [`SexprReader::read_end`] calls
async fn open_reply<R: AsyncRead + Unpin>(rd: &mut SexprReader<R>) -> GsvnResult<()> {
    rd.read_list().await?;
    assert_success(rd).await?;
    rd.read_list().await?;
    Ok(())
}

async fn read_failure<R: AsyncRead + Unpin>(rd: &mut SexprReader<R>) -> GsvnResult<ServerFailure> {
    rd.read_list().await?;
    let mut messages = Vec::new();
    while rd.read_optional().await? {
        rd.read_list().await?;
        let _code = rd.read_number().await?;
        let message = String::from_utf8(rd.read_string().await?).unwrap_or_default();
        rd.read_end().await?;
        messages.push(message);
    }
    rd.read_end().await?;
    Ok(ServerFailure { messages })
}

async fn read_path<R: AsyncRead + Unpin>(rd: &mut SexprReader<R>) -> GsvnResult<String> {
    let bytes = rd.read_string().await?;
    String::from_utf8(bytes).map_err(|_| GsvnError::protocol("non-utf8 path"))
}

/// `( ( changed-path-entry... ) rev author date message )`, with
/// `changed-path-entry = ( path A|D|R|M [ copy-path copy-rev ] )`
async fn read_log_entry<R: AsyncRead + Unpin>(
    rd: &mut SexprReader<R>,
    expect_changed_paths: bool,
) -> GsvnResult<LogEntry> {
    rd.read_list().await?; // start of the entry tuple
    rd.read_list().await?; // changed-path-entries
    let mut changed_paths = Vec::new();
    if expect_changed_paths {
        // `read_optional`'s absent branch consumes the changed-path-entries
        // list's own closing paren, so the loop closes it for us on exit —
        // no separate `read_end` follows here.
        while rd.read_optional().await? {
            rd.read_list().await?;
            let path = read_path(rd).await?;
            let action = rd.read_atom().await?;
            let kind = match action.as_str() {
                "A" => ChangeKind::Add,
                "M" => ChangeKind::Modify,
                "D" => ChangeKind::Delete,
                "R" => ChangeKind::Replace,
                other => {
                    return Err(GsvnError::protocol(format!("unknown change kind `{}`", other)))
                }
            };
            // decides whether a copy-source sublist follows; when absent
            // it has already consumed this entry's own closing paren, so
            // no further `read_end` follows in that branch either.
            let copy_source = if rd.read_optional().await? {
                rd.read_list().await?;
                let from_path = read_path(rd).await?;
                let from_rev = rd.read_number().await?;
                rd.read_end().await?; // close copy-source sublist
                rd.read_end().await?; // close this changed-path entry
                Some((from_path, from_rev))
            } else {
                None
            };
            changed_paths.push(ChangedPath { path, kind, node_kind: NodeKind::None, copy_source });
        }
    } else {
        rd.read_end().await?; // close the (assumed-empty) changed-path-entries list
    }

    let rev = rd.read_number().await?;

    rd.read_list().await?;
    let author = String::from_utf8(rd.read_string().await?).unwrap_or_default();
    rd.read_end().await?;

    rd.read_list().await?;
    let date_raw = String::from_utf8(rd.read_string().await?).unwrap_or_default();
    rd.read_end().await?;
    let timestamp = DateTime::parse_from_rfc3339(&date_raw)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    rd.read_list().await?;
    let message = String::from_utf8(rd.read_string().await?).unwrap_or_default();
    rd.read_end().await?;

    rd.read_end().await?; // close the entry tuple

    let copy_source = changed_paths.iter().find_map(|cp| cp.copy_source.clone());
    Ok(LogEntry {
        rev,
        author: Some(author),
        timestamp,
        message,
        changed_paths,
        copy_source,
        copy_modified: false,
    })
}

/// mechanism negotiation + SASL exchange. ANONYMOUS sends its argument
/// (the literal bytes `"anonymous\n"`) base64-encoded; CRAM-MD5's response
/// is a single raw string at the top level, not wrapped in a list.
async fn authenticate<R: AsyncRead + Unpin, W: AsyncWrite + Unpin + Send>(
    rd: &mut SexprReader<R>,
    wr: &mut SexprWriter<W>,
    credential: &Credential,
) -> GsvnResult<()> {
    rd.read_list().await?;
    assert_success(rd).await?;
    rd.read_list().await?;
    rd.read_list().await?; // mechanism list
    let mut mechs = Vec::new();
    while rd.read_optional().await? {
        mechs.push(rd.read_atom().await?);
    }
    rd.read_end().await?; // close mechanism list
    rd.read_end().await?; // close DATA; skips the trailing realm string
    rd.read_end().await?; // close outer

    let use_anonymous = credential.username.is_none() && mechs.iter().any(|m| m == "ANONYMOUS");

    if use_anonymous {
        wr.write_list().await?;
        wr.write_atom("ANONYMOUS").await?;
        wr.write_list().await?;
        wr.write_string(base64::encode(b"anonymous\n").as_bytes()).await?;
        wr.write_list_end().await?;
        wr.write_list_end().await?;

        if read_ack_ok(rd).await? {
            return Ok(());
        }
    }

    wr.write_list().await?;
    wr.write_atom("CRAM-MD5").await?;
    wr.write_list().await?;
    wr.write_list_end().await?;
    wr.write_list_end().await?;

    rd.read_list().await?;
    let tag = rd.read_atom().await?;
    if tag != "step" {
        return Err(GsvnError::auth(format!("expected CRAM-MD5 step, got `{}`", tag)));
    }
    let challenge = rd.read_string().await?;
    rd.read_end().await?;
    rd.read_end().await?;

    let username = credential.username.as_deref().unwrap_or("");
    let password = credential.password.as_deref().unwrap_or("");
    let mut mac =
        Hmac::<Md5>::new_from_slice(password.as_bytes()).map_err(|e| GsvnError::auth(e.to_string()))?;
    mac.update(&challenge);
    let digest = mac.finalize().into_bytes();
    let response = format!("{} {}", username, hex::encode(digest));
    wr.write_string(response.as_bytes()).await?;

    if !read_ack_ok(rd).await? {
        return Err(GsvnError::auth("server rejected credentials"));
    }
    Ok(())
}

/// like [`read_ack`] but reports success/failure instead of erroring on
/// failure, so the ANONYMOUS/CRAM-MD5 fallback chain can try the next
/// mechanism rather than aborting the connection
async fn read_ack_ok<R: AsyncRead + Unpin>(rd: &mut SexprReader<R>) -> GsvnResult<bool> {
    rd.read_list().await?;
    let tag = rd.read_atom().await?;
    rd.read_list().await?;
    rd.read_end().await?;
    rd.read_end().await?;
    Ok(tag == "success")
}

/// write-side editor commands, emitted by the push planner (C8)
#[derive(Debug, Clone)]
pub enum EditorOp {
    AddDir { path: String, copy_from: Option<(String, Revision)> },
    OpenDir { path: String },
    DeleteEntry { path: String },
    AddFile { path: String },
    OpenFile { path: String },
    ApplyTextDelta { content: Vec<u8> },
    CloseFile,
    CloseDir,
}

/// emits the next editor op for an in-progress commit drive, or `None`
/// once the tree mutation is complete
#[async_trait::async_trait]
pub trait EditorSource: Send {
    async fn next_op(&mut self) -> GsvnResult<Option<EditorOp>>;
}

/// receive side of an editor drive: the update applier (C7) implements
/// this to mutate its index as commands arrive
#[async_trait::async_trait]
pub trait EditorSink: Send {
    async fn add_dir(&mut self, path: &str) -> GsvnResult<()>;
    async fn open_dir(&mut self, path: &str) -> GsvnResult<()>;
    async fn delete_entry(&mut self, path: &str) -> GsvnResult<()>;
    async fn add_file(&mut self, path: &str) -> GsvnResult<()>;
    async fn open_file(&mut self, path: &str) -> GsvnResult<()>;
    async fn begin_textdelta(&mut self) -> GsvnResult<()>;
    async fn textdelta_chunk(&mut self, chunk: &[u8]) -> GsvnResult<()>;
    async fn end_textdelta(&mut self) -> GsvnResult<()>;
    async fn close_file(&mut self) -> GsvnResult<()>;
    async fn close_dir(&mut self) -> GsvnResult<()>;
}

#[cfg(test)]
mod tests;
