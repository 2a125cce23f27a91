//! Non-interactive subcommands: `diff`, `reset` and `status`.
//!
//! Each writes its report to the given writer so the binary can pass stdout
//! and tests can pass a buffer.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pixreview_core::diff::{diff_images, DiffOptions};
use pixreview_core::document::{Document, LoadedDocument};
use pixreview_core::frames::decode_rgba;
use pixreview_core::{ClassificationState, ResetPolicy, ResetScope, ReviewStore};

/// Compares two screenshots, optionally saving the diff raster, and prints
/// the mismatch count. Returns the count so the caller can pick an exit code.
pub fn diff(
    recorded: &Path,
    actual: &Path,
    out: Option<&Path>,
    options: &DiffOptions,
    w: &mut impl Write,
) -> Result<usize> {
    let recorded_img = decode_rgba(recorded)?;
    let actual_img = decode_rgba(actual)?;
    let result = diff_images(&recorded_img, &actual_img, options)
        .with_context(|| format!("comparing {} with {}", recorded.display(), actual.display()))?;

    let count = result.mismatch_count;
    let total = u64::from(result.width) * u64::from(result.height);
    tracing::info!(recorded = %recorded.display(), actual = %actual.display(), count, "headless diff");

    if let Some(out) = out {
        result
            .into_image()
            .save(out)
            .with_context(|| format!("writing diff image {}", out.display()))?;
    }
    writeln!(w, "{count} of {total} pixels differ")?;
    Ok(count)
}

pub async fn reset(
    store: &ReviewStore,
    scope: ResetScope,
    policy: ResetPolicy,
    w: &mut impl Write,
) -> Result<()> {
    let report = store.reset(scope, policy).await.context("resetting verdicts")?;
    tracing::info!(?scope, removed = report.removed, failed = report.failed.len(), "headless reset");
    writeln!(w, "removed {} verdicts", report.removed)?;
    for key in &report.failed {
        writeln!(w, "could not remove {key}")?;
    }
    Ok(())
}

/// Lists every case of an index document with its stored classification.
pub async fn status(store: &ReviewStore, document: &Path, json: bool, w: &mut impl Write) -> Result<()> {
    let doc = LoadedDocument::from_path(document)?;
    if !matches!(doc.document, Document::Index(_)) {
        bail!("{} is a single case, not an index", document.display());
    }
    let states = store.snapshot().await.context("reading review states")?;

    for entry in doc.entries()? {
        let state = states.get(&entry.key.storage_key()).copied().unwrap_or(ClassificationState::Unset);
        if json {
            let line = serde_json::json!({
                "name": entry.name,
                "locator": entry.key.locator,
                "actual_hash": entry.key.actual_hash,
                "state": state.to_string(),
            });
            writeln!(w, "{line}")?;
        } else {
            writeln!(w, "{:<10} {}", state.to_string(), entry.name)?;
        }
    }
    Ok(())
}
