//! CLI surface (§6 **(added)**): two subcommands mirroring spec.md's
//! `fetch`/`push` entry points, wired with `clap` derive macros the way
//! `bit/src/cli.rs` wires its own subcommand enum.
//!
//! Both subcommands drive the library's planners against the one
//! in-process [`libgsvn::adapters::InMemoryRepo`] this crate ships (C10):
//! a real deployment supplies its own `ObjectStore`/`RefStore`/`Index`
//! backed by an actual git repository, which is out of this crate's scope
//! (spec.md §1's external collaborators list). Run here, each invocation
//! starts from an empty store, so this binary is a reference driver for
//! the wire protocol and planners rather than a persistent bridge.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use libgsvn::adapters::{InMemoryRepo, ObjectStore};
use libgsvn::apply::{BranchState, UpdateApplier};
use libgsvn::authors::AuthorsFile;
use libgsvn::cache::RevisionCache;
use libgsvn::fetch::{BranchRegistry, FetchPlanner, LogSource};
use libgsvn::model::{Credential, Revision};
use libgsvn::push::{check_no_intermediate_commits, DeleteEditorSource, DiffEditorSource};
use libgsvn::protocol::Client;
use libgsvn::transport::{dial_tcp, TunnelTransport};
use log::info;
use std::ffi::OsString;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Parser, Debug)]
#[clap(author, about = "A bidirectional bridge between git and a Subversion server")]
struct Opts {
    /// raise the log level regardless of GSVN_LOG
    #[clap(short, long, global = true)]
    verbose: bool,
    #[clap(subcommand)]
    subcmd: SubCmd,
}

#[derive(Subcommand, Debug)]
enum SubCmd {
    /// fetch revisions from an svn server and print the commits produced
    Fetch(FetchArgs),
    /// push the content of one commit as a new svn revision
    Push(PushArgs),
}

#[derive(clap::Args, Debug)]
struct FetchArgs {
    /// `svn://host[:port]/path` or `svn+ssh://host/path`
    url: String,
    /// authors-mapping file (see spec.md §6); anonymous identities used if omitted
    #[clap(long)]
    authors: Option<std::path::PathBuf>,
    /// fetch up to this revision instead of the server's latest
    #[clap(long)]
    rev: Option<Revision>,
}

#[derive(clap::Args, Debug)]
struct PushArgs {
    url: String,
    /// svn path this push lands on, e.g. `/trunk`
    #[clap(long)]
    svn_path: String,
    /// the revision this push's plan was computed against; rejected if the
    /// server has since moved past it unless `--force` is given
    #[clap(long)]
    expected_rev: Revision,
    /// commit message for the new revision
    #[clap(long)]
    message: String,
    #[clap(long)]
    force: bool,
    /// push an empty new_head: removes the branch server-side (§4.8 `Delete`)
    #[clap(long)]
    delete: bool,
}

pub fn run<T: Into<OsString> + Clone>(args: impl IntoIterator<Item = T>) -> anyhow::Result<()> {
    let opts = Opts::parse_from(args);
    if opts.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    rt.block_on(async move {
        match opts.subcmd {
            SubCmd::Fetch(args) => run_fetch(args).await,
            SubCmd::Push(args) => run_push(args).await,
        }
    })
}

enum Scheme {
    Tcp,
    Ssh,
}

/// splits `svn://host[:port]/path` / `svn+ssh://host/path` into its
/// transport scheme, dial target, and repository path. No general URL
/// parser is pulled in since only these two gsvn-relevant schemes matter
/// here (HTTP/HTTPS transport is its own external collaborator, C10).
fn parse_url(url: &str) -> anyhow::Result<(Scheme, String, u16, String)> {
    let (scheme, rest) = if let Some(rest) = url.strip_prefix("svn://") {
        (Scheme::Tcp, rest)
    } else if let Some(rest) = url.strip_prefix("svn+ssh://") {
        (Scheme::Ssh, rest)
    } else {
        bail!("unsupported url `{}`: expected svn:// or svn+ssh://", url);
    };
    let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
    let (host, port) = match authority.split_once(':') {
        Some((h, p)) => (h, p.parse().context("invalid port")?),
        None => (authority, 3690),
    };
    Ok((scheme, host.to_string(), port, format!("/{}", path)))
}

fn credential_from_env() -> Credential {
    Credential { username: std::env::var("GSVN_USER").ok(), password: std::env::var("GSVN_PASSWORD").ok() }
}

struct ClientLogSource<'a, IO> {
    client: &'a mut Client<IO>,
}

#[async_trait::async_trait]
impl<'a, IO: AsyncRead + AsyncWrite + Unpin + Send> LogSource for ClientLogSource<'a, IO> {
    async fn log(
        &mut self,
        path: &str,
        start: Revision,
        end: Revision,
        changed_paths: bool,
    ) -> libgsvn::error::GsvnResult<Vec<libgsvn::model::LogEntry>> {
        self.client.log(&[path.to_string()], start, end, changed_paths).await
    }
}

async fn run_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let (scheme, host, port, path) = parse_url(&args.url)?;
    let credential = credential_from_env();
    let authors = match &args.authors {
        Some(p) => AuthorsFile::parse(&std::fs::read_to_string(p).context("reading authors file")?)?,
        None => AuthorsFile::default(),
    };

    match scheme {
        Scheme::Tcp => {
            let io = dial_tcp(&host, port).await?;
            fetch_over(io, &args.url, &credential, &path, args.rev, &authors).await
        }
        Scheme::Ssh => {
            let io = TunnelTransport::spawn("ssh", &[host, "svnserve".to_string(), "-t".to_string()])?;
            fetch_over(io, &args.url, &credential, &path, args.rev, &authors).await
        }
    }
}

async fn fetch_over<IO: AsyncRead + AsyncWrite + Unpin + Send>(
    io: IO,
    url: &str,
    credential: &Credential,
    path: &str,
    rev: Option<Revision>,
    authors: &AuthorsFile,
) -> anyhow::Result<()> {
    let mut client = Client::connect(io, url, credential).await?;
    let uuid = client.repo_uuid().to_string();
    let target_rev = match rev {
        Some(r) => r,
        None => client.get_latest_rev().await?,
    };
    info!("fetching {} up to r{}", path, target_rev);

    let mut registry = BranchRegistry::new();
    let branch_id = registry.get_or_create(path, 0);

    let mut planner = FetchPlanner::new(ClientLogSource { client: &mut client }, registry);
    planner.request(branch_id, target_rev);
    planner.run().await?;
    let mut registry = planner.into_registry();

    let repo = InMemoryRepo::new();
    let mut cache = RevisionCache::new();
    let entries = std::mem::take(&mut registry.get_mut(branch_id).pending);
    let mut branch = BranchState {
        path: path.to_string(),
        start: registry.get(branch_id).start,
        is_tag: false,
        head: None,
        copy_source_head: None,
        inherited_mergeinfo: None,
    };

    for entry in &entries {
        let mut applier =
            UpdateApplier { index: &repo, store: &repo, refs: &repo, cache: &mut cache, authors, uuid: uuid.clone() };
        let rev = entry.rev;
        let object = applier
            .apply_entry(&branch, entry, None, |mut editor| {
                let client = &mut client;
                async move { client.update(path, rev, &mut editor).await }
            })
            .await?;
        branch.head = Some(object);
        info!("r{} -> commit {}", entry.rev, hex::encode(object));
    }

    println!("fetched {} revisions for {}", entries.len(), path);
    Ok(())
}

async fn run_push(args: PushArgs) -> anyhow::Result<()> {
    let (scheme, host, port, path) = parse_url(&args.url)?;
    let credential = credential_from_env();

    match scheme {
        Scheme::Tcp => {
            let io = dial_tcp(&host, port).await?;
            push_over(io, &args.url, &credential, &path, &args).await
        }
        Scheme::Ssh => {
            let io = TunnelTransport::spawn("ssh", &[host, "svnserve".to_string(), "-t".to_string()])?;
            push_over(io, &args.url, &credential, &path, &args).await
        }
    }
}

async fn push_over<IO: AsyncRead + AsyncWrite + Unpin + Send>(
    io: IO,
    url: &str,
    credential: &Credential,
    _repo_root_path: &str,
    args: &PushArgs,
) -> anyhow::Result<()> {
    let mut client = Client::connect(io, url, credential).await?;
    let server_latest = client.get_latest_rev().await?;
    check_no_intermediate_commits(&args.svn_path, args.expected_rev, server_latest, args.force)?;

    if args.delete {
        info!("r{}: deleting {}", server_latest + 1, args.svn_path);
        let mut source = DeleteEditorSource::new(args.svn_path.clone());
        let info = client.commit(&args.message, &mut source).await?;
        println!("pushed r{} to {} (delete)", info.rev, args.svn_path);
        return Ok(());
    }

    // this reference driver has no persistent local repository to diff
    // against, so it pushes an empty tree as a demonstration of the wire-up;
    // a real caller supplies the old/new tree oids from its own git history.
    let repo = InMemoryRepo::new();
    let new_tree_oid = repo.write_tree(&libgsvn::adapters::Tree::default()).await?;
    let mut source = DiffEditorSource::new(&repo, libgsvn::adapters::NULL_OID, new_tree_oid).await?;
    let info = client.commit(&args.message, &mut source).await?;

    println!("pushed r{} to {}", info.rev, args.svn_path);
    Ok(())
}
