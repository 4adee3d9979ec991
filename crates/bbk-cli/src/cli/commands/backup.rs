//! `bbk backup` – mirror a subject to local disk.

use anyhow::{Context, Result};
use bbk_core::catalog::Credentials;
use bbk_core::config::BackupConfig;
use bbk_core::scheduler::{self, BackupEvent, BackupRequest, EventSink};
use std::io::{self, Write};
use std::time::Instant;

use crate::cli::format::{format_bytes, format_elapsed};
use crate::cli::{BackupArgs, CREDENTIALS_ENV};

/// Empty or unset means anonymous access.
pub fn parse_credentials(raw: Option<&str>) -> Result<Option<Credentials>> {
    match raw {
        None | Some("") => Ok(None),
        Some(raw) => Credentials::parse(raw)
            .map(Some)
            .with_context(|| format!("invalid {}", CREDENTIALS_ENV)),
    }
}

pub async fn run_backup_command(
    cfg: &BackupConfig,
    args: &BackupArgs,
    raw_credentials: Option<&str>,
) -> Result<()> {
    run_backup_reporting(cfg, args, raw_credentials, io::stdout(), io::stderr()).await
}

/// Runs the backup, writing progress to `out` and warnings to `err`.
///
/// Every event of the run is written before this returns, on success and on
/// failure alike.
pub async fn run_backup_reporting<O, E>(
    cfg: &BackupConfig,
    args: &BackupArgs,
    raw_credentials: Option<&str>,
    out: O,
    err: E,
) -> Result<()>
where
    O: Write + Send + 'static,
    E: Write + Send + 'static,
{
    let started = Instant::now();
    let credentials = parse_credentials(raw_credentials)?;
    if let Some(c) = &credentials {
        tracing::info!(user = c.user(), "using basic auth credentials");
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<BackupEvent>();
    let printer = tokio::spawn(async move {
        let (mut out, mut err) = (out, err);
        while let Some(event) = rx.recv().await {
            if let Err(e) = print_event(&event, &mut out, &mut err) {
                tracing::warn!("cannot write progress: {}", e);
            }
        }
        let _ = out.flush();
        let _ = err.flush();
        out
    });

    let request = BackupRequest {
        subject: args.subject.clone(),
        download_root: args.download_dir.clone(),
        credentials,
    };
    let result = scheduler::run_backup(cfg, request, EventSink::new(tx)).await;

    // run_backup has released every sender by now, so this ends once the queue is empty.
    let mut out = printer.await.context("progress printer failed")?;

    let summary = result.with_context(|| {
        format!(
            "backup of '{}' failed after {}",
            args.subject,
            format_elapsed(started.elapsed())
        )
    })?;

    writeln!(
        out,
        "Done: {} files ({} downloaded, {} already present), {}, took {}",
        summary.file_count,
        summary.downloaded,
        summary.cache_hits,
        format_bytes(summary.total_bytes),
        format_elapsed(started.elapsed())
    )?;
    out.flush()?;
    Ok(())
}

fn print_event(event: &BackupEvent, out: &mut impl Write, err: &mut impl Write) -> io::Result<()> {
    match event {
        BackupEvent::RepositoryDiscovered {
            subject,
            repository,
        } => writeln!(out, "Discovered repo: '{}/{}'", subject, repository),
        BackupEvent::PackageDiscovered {
            subject,
            repository,
            package,
        } => writeln!(out, "Discovered package: '{}/{}/{}'", subject, repository, package),
        BackupEvent::FileDiscovered {
            subject,
            repository,
            package,
            path,
        } => writeln!(
            out,
            "Discovered file: '{}/{}/{}/{}'",
            subject, repository, package, path
        ),
        BackupEvent::StaleCacheDiscarded {
            destination,
            reason,
        } => writeln!(
            err,
            "Warning: '{}': {}, deleting the file and trying again...",
            destination.display(),
            reason
        ),
        BackupEvent::AttemptFailed {
            file,
            attempt,
            will_retry,
            error,
        } => {
            let next = if *will_retry { "retrying" } else { "giving up" };
            writeln!(
                err,
                "Warning: problem downloading '{}' (attempt {}): {}, {}...",
                file, attempt, error, next
            )
        }
        BackupEvent::FileResolved(outcome) => writeln!(
            out,
            "File '{}': {}, {}",
            outcome.destination.display(),
            outcome.origin,
            format_bytes(outcome.bytes)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_empty_credentials_are_anonymous() {
        assert!(parse_credentials(None).unwrap().is_none());
        assert!(parse_credentials(Some("")).unwrap().is_none());
    }

    #[test]
    fn credentials_user_and_key() {
        let c = parse_credentials(Some("alice:key")).unwrap().unwrap();
        assert_eq!(c.user(), "alice");
    }

    #[test]
    fn malformed_credentials_name_the_variable() {
        let err = parse_credentials(Some("alice")).unwrap_err();
        assert!(format!("{:#}", err).contains(CREDENTIALS_ENV));
    }
}
