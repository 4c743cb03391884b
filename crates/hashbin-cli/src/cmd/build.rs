use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use hashbin_core::config::{BinConfig, DelegationConfig};
use hashbin_core::delegation::DelegationGraph;
use hashbin_core::keys::KeyPair;
use hashbin_core::signer::{Ed25519Signer, MetadataSigner};
use hashbin_core::store::RetryPolicy;
use hashbin_store::FsStore;

use crate::io::{export, keys, targets};
use crate::output;

/// Signing passes before a build gives up on still-unsigned documents.
const SIGNING_PASSES: u32 = 3;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub count: u32,
    pub targets_dir: String,
    pub out_dir: String,
    pub keys_dir: Option<String>,
    pub parent_expiry_days: i64,
    pub bin_expiry_days: i64,
    pub attempts: u32,
}

#[derive(Debug, Serialize)]
pub struct BuildOut {
    pub bins: u32,
    pub artifacts: usize,
    pub out_dir: String,
    pub parent_role: String,
    pub parent_key_id: String,
    pub bin_key_id: String,
    pub stored: Vec<String>,
    pub failed: Vec<FailedOut>,
}

#[derive(Debug, Serialize)]
pub struct FailedOut {
    pub role: String,
    pub error: String,
}

pub async fn run(opts: BuildOptions) -> Result<()> {
    // Reject bad bin counts before touching the filesystem.
    let bins = BinConfig::new(opts.count)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    pb.set_message("loading keys");
    let (parent_key, bin_key) = match &opts.keys_dir {
        Some(dir) => keys::load_pair(Path::new(dir))?,
        None => {
            tracing::warn!("no --keys given, generating ephemeral keys");
            (KeyPair::generate(), KeyPair::generate())
        }
    };
    let parent_signer = Ed25519Signer::new(parent_key)?;
    let bin_signer = Ed25519Signer::new(bin_key)?;

    pb.set_message("collecting targets");
    let artifacts = targets::collect_targets(Path::new(&opts.targets_dir))?;
    let artifact_count = artifacts.len();

    pb.set_message("building delegation");
    let cfg = DelegationConfig::new(bins, OffsetDateTime::now_utc()).with_expiries(
        Duration::days(opts.parent_expiry_days),
        Duration::days(opts.bin_expiry_days),
    );
    let mut graph = DelegationGraph::build(&cfg, &bin_signer.key_record())?;
    graph.add_artifacts(artifacts)?;

    pb.set_message("signing");
    for pass in 1..=SIGNING_PASSES {
        let report = graph.finalize(&parent_signer, &bin_signer)?;
        if report.is_complete() {
            break;
        }
        tracing::warn!(pass, failed = report.failed().count(), "signing pass incomplete");
    }
    if !graph.is_fully_signed() {
        pb.finish_and_clear();
        return Err(anyhow!(
            "could not sign every document after {SIGNING_PASSES} passes"
        ));
    }

    pb.set_message("writing metadata");
    let store = Arc::new(FsStore::open(&opts.out_dir)?);
    let docs = graph.signed_documents()?;
    let policy = RetryPolicy {
        max_attempts: opts.attempts,
    };
    let report = export::persist_concurrently(docs, store, policy).await?;

    pb.finish_and_clear();

    let out = BuildOut {
        bins: bins.bin_count(),
        artifacts: artifact_count,
        out_dir: opts.out_dir.clone(),
        parent_role: graph.parent_role().to_string(),
        parent_key_id: parent_signer.key_id().to_string(),
        bin_key_id: bin_signer.key_id().to_string(),
        stored: report.stored().map(str::to_string).collect(),
        failed: report
            .failed()
            .map(|(role, e)| FailedOut {
                role: role.to_string(),
                error: e.to_string(),
            })
            .collect(),
    };

    if output::is_json() {
        output::print(&out)?;
    } else {
        output::status(
            out.failed.is_empty(),
            &format!(
                "{} artifacts in {} bins, {} documents written to {}",
                out.artifacts,
                out.bins,
                out.stored.len(),
                out.out_dir
            ),
        )?;
        for f in &out.failed {
            output::status(false, &format!("{}: {}", f.role, f.error))?;
        }
    }

    report.into_result()?;
    Ok(())
}
