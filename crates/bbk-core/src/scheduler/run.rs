//! Drive one full backup of a subject.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::catalog::{CatalogClient, Credentials, Package, RemoteFile, Repository};
use crate::config::BackupConfig;
use crate::control::RunControl;
use crate::pool::WorkerPool;
use crate::retry::RetryPolicy;
use crate::transfer::{self, TransferContext, TransferOutcome};

use super::progress::{BackupEvent, EventSink, RunStats, RunSummary};

/// What to back up and where to put it.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub subject: String,
    pub download_root: PathBuf,
    pub credentials: Option<Credentials>,
}

/// Result of one fan-out task; each kind schedules the next level.
enum Step {
    Packages {
        repo: Repository,
        packages: Vec<Package>,
    },
    Files {
        repo: Repository,
        pkg: Package,
        files: Vec<RemoteFile>,
    },
    Resolved(TransferOutcome),
}

/// Backs up every file of `request.subject` under `request.download_root`.
///
/// Returns the run's totals once every discovered file has a verified outcome.
/// On the first fatal error the run is aborted: pools stop accepting work,
/// pending tasks are cancelled, and the error is returned without a summary.
/// Either way, every event emitted during the run has been sent (and every
/// sender clone released) by the time this returns.
pub async fn run_backup(
    cfg: &BackupConfig,
    request: BackupRequest,
    events: EventSink,
) -> Result<RunSummary> {
    cfg.validate()?;
    let client = CatalogClient::from_config(cfg, request.credentials.clone())?;

    let control = Arc::new(RunControl::new());
    let network = WorkerPool::new("network", cfg.http_threads, Arc::clone(&control));
    let checksum = WorkerPool::new(
        "checksum",
        cfg.effective_checksum_threads(),
        Arc::clone(&control),
    );
    tracing::info!(
        subject = %request.subject,
        root = %request.download_root.display(),
        http_threads = network.size(),
        checksum_threads = checksum.size(),
        "starting backup"
    );

    let ctx = Arc::new(TransferContext {
        client: Arc::new(client),
        subject: request.subject,
        download_root: request.download_root,
        network,
        checksum,
        network_buffer_bytes: cfg.network_buffer_bytes,
        checksum_buffer_bytes: cfg.checksum_buffer_bytes,
        retry: RetryPolicy::from_config(cfg),
        events,
    });
    let stats = RunStats::new();

    if let Err(e) = traverse(&ctx, &stats).await {
        control.abort();
        ctx.network.close();
        ctx.checksum.close();
        tracing::error!("backup aborted: {:#}", e);
        return Err(e);
    }

    let summary = stats.summary();
    tracing::info!(
        files = summary.file_count,
        bytes = summary.total_bytes,
        downloaded = summary.downloaded,
        cache_hits = summary.cache_hits,
        "backup complete"
    );
    Ok(summary)
}

async fn traverse(ctx: &Arc<TransferContext>, stats: &RunStats) -> Result<()> {
    let repos = {
        let client = Arc::clone(&ctx.client);
        let subject = ctx.subject.clone();
        ctx.network
            .run(move || client.list_repositories(&subject))
            .await?
            .with_context(|| format!("list repositories of '{}'", ctx.subject))?
    };

    let mut tasks: JoinSet<Result<Step>> = JoinSet::new();

    for repo in repos {
        ctx.events.emit(BackupEvent::RepositoryDiscovered {
            subject: ctx.subject.clone(),
            repository: repo.name.clone(),
        });
        tasks.spawn(list_packages(Arc::clone(ctx), repo));
    }

    let drained = drain(ctx, stats, &mut tasks).await;
    if drained.is_err() {
        // Wait for aborted tasks to be dropped so no clone of the context (and
        // its event sender) outlives the run.
        tasks.shutdown().await;
    }
    drained?;

    tracing::debug!(
        discovered = stats.discovered_files(),
        resolved = stats.resolved_files(),
        network_busy = ctx.network.busy(),
        checksum_busy = ctx.checksum.busy(),
        "catalog stream drained"
    );
    Ok(())
}

/// Joins tasks as they finish, scheduling the next level for each step.
async fn drain(
    ctx: &Arc<TransferContext>,
    stats: &RunStats,
    tasks: &mut JoinSet<Result<Step>>,
) -> Result<()> {
    while let Some(joined) = tasks.join_next().await {
        let step = joined.context("backup task failed to complete")??;
        match step {
            Step::Packages { repo, packages } => {
                for pkg in packages {
                    ctx.events.emit(BackupEvent::PackageDiscovered {
                        subject: ctx.subject.clone(),
                        repository: repo.name.clone(),
                        package: pkg.name.clone(),
                    });
                    tasks.spawn(list_files(Arc::clone(ctx), repo.clone(), pkg));
                }
            }
            Step::Files { repo, pkg, files } => {
                for file in files {
                    stats.record_discovered();
                    ctx.events.emit(BackupEvent::FileDiscovered {
                        subject: ctx.subject.clone(),
                        repository: repo.name.clone(),
                        package: pkg.name.clone(),
                        path: file.path.clone(),
                    });
                    tasks.spawn(transfer_one(
                        Arc::clone(ctx),
                        repo.clone(),
                        pkg.clone(),
                        file,
                    ));
                }
            }
            Step::Resolved(outcome) => {
                stats.record_resolved(&outcome);
                ctx.events.emit(BackupEvent::FileResolved(outcome));
            }
        }
    }
    Ok(())
}

async fn list_packages(ctx: Arc<TransferContext>, repo: Repository) -> Result<Step> {
    let client = Arc::clone(&ctx.client);
    let subject = ctx.subject.clone();
    let target = repo.clone();
    let packages = ctx
        .network
        .run(move || client.list_packages(&subject, &target, 0))
        .await?
        .with_context(|| format!("list packages of '{}/{}'", ctx.subject, repo.name))?;
    Ok(Step::Packages { repo, packages })
}

async fn list_files(ctx: Arc<TransferContext>, repo: Repository, pkg: Package) -> Result<Step> {
    let client = Arc::clone(&ctx.client);
    let subject = ctx.subject.clone();
    let (r, p) = (repo.clone(), pkg.clone());
    let files = ctx
        .network
        .run(move || client.list_files(&subject, &r, &p))
        .await?
        .with_context(|| {
            format!(
                "list files of '{}/{}/{}'",
                ctx.subject, repo.name, pkg.name
            )
        })?;
    Ok(Step::Files { repo, pkg, files })
}

async fn transfer_one(
    ctx: Arc<TransferContext>,
    repo: Repository,
    pkg: Package,
    file: RemoteFile,
) -> Result<Step> {
    let name = format!("{}/{}/{}/{}", ctx.subject, repo.name, pkg.name, file.path);
    let outcome = transfer::transfer_file(&ctx, repo, pkg, file)
        .await
        .with_context(|| format!("file '{}'", name))?;
    Ok(Step::Resolved(outcome))
}
