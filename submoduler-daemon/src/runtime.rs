use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use submoduler_core::paths::{repos_root, socket_path, submoduler_root};
use submoduler_core::Config;
use submoduler_git::{CredentialContext, CredentialManager, Credentials, GitOperations, SystemGit};
use submoduler_resolver::{GitHubHost, RepoResolver, Resolution};

use crate::error::{io_err, DaemonError};
use crate::pool::SyncWorkerPool;
use crate::protocol::{DaemonCommand, DaemonReply};
use crate::status::{SharedStatus, StatusBoard};
use crate::worker::unix_seconds_now;

/// How long shutdown waits for in-flight cycles before aborting them.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Process entry parameters, already defaulted from the environment.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub home: PathBuf,
    pub config_path: PathBuf,
    pub username: Option<String>,
    pub email: Option<String>,
    pub token: Option<String>,
    pub shutdown_grace: Duration,
}

impl RunOptions {
    pub fn new(home: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            config_path: config_path.into(),
            username: None,
            email: None,
            token: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(options: RunOptions) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(options))
}

/// Validate inputs, claim the control socket, then resolve and sync until stopped.
///
/// Credentials, config and the single-instance check all happen before the
/// first side effect; a second instance against the same home never touches
/// the credential file or a working copy.
pub async fn run(options: RunOptions) -> Result<(), DaemonError> {
    let credentials = Credentials::new(options.username, options.email, options.token)?;
    let config = Config::load(&options.config_path)?;
    tracing::info!(
        config = %options.config_path.display(),
        repos = config.repos.len(),
        organization = config.organization().map(|(name, _)| name).unwrap_or("-"),
        interval_secs = config.interval,
        "starting submoduler",
    );
    if config.repos.is_empty() && config.organization().is_none() {
        tracing::warn!("config lists no repositories and no organization; nothing will sync");
    }

    let home = options.home;
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;
    ensure_runtime_dirs(&home)?;
    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::debug!(socket = %socket.display(), "control socket listening");

    let status = StatusBoard::shared(unix_seconds_now());
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(16);

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let status = status.clone();
        let shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let result =
                socket_server_task(listener, socket, status, shutdown.clone(), shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let synced = sync_until_stopped(
        &home,
        &config,
        credentials,
        status,
        &mut shutdown_rx,
        options.shutdown_grace,
    )
    .await;
    let _ = shutdown_tx.send(());

    let (socket_result, signal_result) = tokio::join!(socket_handle, signal_handle);
    synced?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

async fn sync_until_stopped(
    home: &Path,
    config: &Config,
    credentials: Credentials,
    status: SharedStatus,
    shutdown_rx: &mut broadcast::Receiver<()>,
    grace: Duration,
) -> Result<(), DaemonError> {
    let ctx = {
        let home = home.to_path_buf();
        let host = config.host.clone();
        tokio::task::spawn_blocking(move || CredentialManager::setup(credentials, &home, &host))
            .await
            .map_err(|err| DaemonError::Protocol(format!("credential setup join error: {err}")))??
    };
    let ctx = Arc::new(ctx);
    let git: Arc<dyn GitOperations> = Arc::new(SystemGit::default());

    let resolution = resolve(config, home, git.clone(), ctx.clone()).await?;
    if stop_requested(shutdown_rx) {
        tracing::info!("stop requested during resolution; not starting workers");
        return Ok(());
    }

    let pool = SyncWorkerPool::start(resolution.repos, config.interval(), ctx, git, status);
    if pool.is_empty() {
        tracing::warn!("no repositories resolved; idling until stopped");
    }

    let _ = shutdown_rx.recv().await;
    tracing::info!(workers = pool.len(), "stopping sync workers");
    pool.shutdown(grace).await;
    Ok(())
}

fn stop_requested(shutdown_rx: &mut broadcast::Receiver<()>) -> bool {
    !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty))
}

async fn resolve(
    config: &Config,
    home: &Path,
    git: Arc<dyn GitOperations>,
    ctx: Arc<CredentialContext>,
) -> Result<Resolution, DaemonError> {
    let config = config.clone();
    let cache = repos_root(home);
    let resolution = tokio::task::spawn_blocking(move || {
        let host = GitHubHost::default();
        RepoResolver::new(git.as_ref(), &host, ctx.as_ref(), cache).resolve(&config)
    })
    .await
    .map_err(|err| DaemonError::Protocol(format!("resolution join error: {err}")))??;
    Ok(resolution)
}

async fn socket_server_task(
    listener: UnixListener,
    socket: PathBuf,
    status: SharedStatus,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let status = status.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, status, shutdown_tx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    drop(listener);
    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    status: SharedStatus,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let mut stopping = false;
        let reply = match serde_json::from_str::<DaemonCommand>(&line) {
            Ok(DaemonCommand::Status { repo }) => {
                DaemonReply::Status(status.read().await.snapshot(repo.as_deref()))
            }
            Ok(DaemonCommand::Stop) => {
                tracing::info!("stop requested over control socket");
                let _ = shutdown_tx.send(());
                stopping = true;
                DaemonReply::Stopping
            }
            Err(err) => DaemonReply::Error {
                message: format!("invalid command: {err}"),
            },
        };

        write_reply(&mut writer, &reply).await?;
        if stopping {
            break;
        }
    }

    Ok(())
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::AlreadyRunning {
                socket: socket.to_path_buf(),
            });
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    for dir in [submoduler_root(home), repos_root(home)] {
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
    }
    Ok(())
}

async fn write_reply(writer: &mut OwnedWriteHalf, reply: &DaemonReply) -> Result<(), DaemonError> {
    let mut line = serde_json::to_string(reply)?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

/// `RUST_LOG` filters (default `info`); `SUBMODULER_LOG_JSON` switches to JSON lines.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if std::env::var_os("SUBMODULER_LOG_JSON").is_some() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
