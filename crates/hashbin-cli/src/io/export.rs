use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::task::JoinSet;

use hashbin_core::delegation::SignedDocument;
use hashbin_core::store::{persist_one, MetadataStore, PersistReport, RetryPolicy};

/// Persist signed documents concurrently, one blocking task per document.
///
/// Signed documents are immutable, so writes need no coordination beyond the
/// store itself. Outcomes are returned in input order.
pub async fn persist_concurrently<S>(
    docs: Vec<SignedDocument>,
    store: Arc<S>,
    policy: RetryPolicy,
) -> Result<PersistReport>
where
    S: MetadataStore + 'static,
{
    let mut set = JoinSet::new();
    for (i, doc) in docs.into_iter().enumerate() {
        let store = Arc::clone(&store);
        set.spawn_blocking(move || (i, persist_one(&doc, store.as_ref(), policy)));
    }

    let mut outcomes = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        let (i, outcome) = joined.map_err(|e| anyhow!("persist task failed: {e}"))?;
        outcomes.push((i, outcome));
    }
    outcomes.sort_by_key(|(i, _)| *i);

    Ok(PersistReport {
        outcomes: outcomes.into_iter().map(|(_, o)| o).collect(),
    })
}
