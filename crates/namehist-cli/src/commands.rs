//! Subcommand implementations

use anyhow::{Context, Result};
use namehist_core::{MemberUpdate, UserId};
use namehist_store::RecordStore;
use namehist_sync::{HistoryError, NameLedger, ResyncReport, TransitionOutcome};
use std::fmt::Write as _;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Counters for one `run` session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunSummary {
    /// Lines parsed as member updates
    pub(crate) events: usize,
    /// Events that changed a record or re-synced its message
    pub(crate) recorded: usize,
    /// Events carrying no new name
    pub(crate) ignored: usize,
    /// Lines that were not valid member updates
    pub(crate) malformed: usize,
    /// History saved but message left out of sync
    pub(crate) sync_failures: usize,
    /// Events dropped because history could not be saved
    pub(crate) dropped: usize,
}

/// Process member updates, one JSON object per line, in arrival order
///
/// A bad line or a failed event is logged and skipped; only a failure to
/// read the input ends the session.
pub(crate) async fn run<R>(ledger: &NameLedger, input: R) -> Result<RunSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = RunSummary::default();
    let mut lines = input.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let update: MemberUpdate = match serde_json::from_str(&line) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping malformed member update");
                summary.malformed += 1;
                continue;
            }
        };
        summary.events += 1;

        match ledger.on_member_update(&update).await {
            Ok(TransitionOutcome::Ignored | TransitionOutcome::Unchanged(_)) => summary.ignored += 1,
            Ok(TransitionOutcome::Recorded(_) | TransitionOutcome::Synced { .. }) => {
                summary.recorded += 1;
            }
            Err(e @ HistoryError::ArtifactSyncFailed { .. }) => {
                tracing::warn!(error = %e, "Name change recorded, message not updated");
                summary.recorded += 1;
                summary.sync_failures += 1;
            }
            Err(e) => {
                tracing::error!(user_id = %update.after.user_id, error = %e, "Dropping member update");
                summary.dropped += 1;
            }
        }
    }

    tracing::info!(
        events = summary.events,
        recorded = summary.recorded,
        malformed = summary.malformed,
        sync_failures = summary.sync_failures,
        dropped = summary.dropped,
        "Input exhausted"
    );
    Ok(summary)
}

/// Human-readable summary of a sweep
pub(crate) fn format_report(report: &ResyncReport) -> String {
    let Some(destination) = report.destination else {
        return "No destination channel configured; nothing to sync".to_string();
    };

    let mut out = format!(
        "Reconciled {}/{} history messages in channel {destination} \
         (created {}, recreated {}, edited {})",
        report.reconciled(),
        report.total,
        report.created,
        report.recreated,
        report.edited,
    );
    for failure in &report.failures {
        let _ = write!(out, "\n  failed {}: {}", failure.user_id, failure.error);
    }
    out
}

/// Fail when a sweep left some messages out of sync
pub(crate) fn check_report(report: &ResyncReport) -> Result<()> {
    if !report.is_clean() {
        anyhow::bail!(
            "{} of {} history messages could not be synced",
            report.failures.len(),
            report.total
        );
    }
    Ok(())
}

/// Current and past names of `user_id`
pub(crate) async fn history(store: &dyn RecordStore, user_id: UserId, json: bool) -> Result<String> {
    let record = store
        .get(user_id)
        .await
        .with_context(|| format!("failed to read history of {user_id}"))?;

    if json {
        return serde_json::to_string_pretty(&record).context("failed to encode record");
    }

    Ok(match record {
        None => format!("No name history recorded for {user_id}"),
        Some(record) => {
            let past = if record.past_names.is_empty() {
                "None".to_string()
            } else {
                record.past_names.join(", ")
            };
            format!(
                "User ID: {}\nCurrent Name: {}\nPast Names: {past}",
                record.user_id, record.current_name
            )
        }
    })
}
