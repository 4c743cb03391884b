//! Persistence seam and per-document publishing.
//!
//! The core never writes to durable storage itself. Signed documents are handed
//! to a [`MetadataStore`] one at a time; each document's store call is an
//! independent unit of work with its own retries, so one failing write never
//! blocks or corrupts the others. Documents are never re-signed here.

use crate::delegation::SignedDocument;
use crate::errors::{HashbinError, HashbinResult};

/// Durable storage for signed metadata documents.
pub trait MetadataStore: Send + Sync {
    /// Store the encoded document under `role`.
    ///
    /// Errors should be [`HashbinError::Persistence`]; they are retried
    /// according to the caller's [`RetryPolicy`].
    fn store(&self, role: &str, bytes: &[u8]) -> HashbinResult<()>;
}

/// How many times a single document's store call may be attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self { max_attempts: 1 }
    }
}

/// Outcome of persisting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub role: String,
    pub attempts: u32,
    pub result: Result<(), HashbinError>,
}

/// Per-document outcomes of [`persist_all`].
#[derive(Debug, Clone, Default)]
pub struct PersistReport {
    pub outcomes: Vec<PersistOutcome>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn stored(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.role.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &HashbinError)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            Err(e) => Some((o.role.as_str(), e)),
            Ok(()) => None,
        })
    }

    /// Convert into an error if any document could not be stored.
    pub fn into_result(self) -> HashbinResult<()> {
        match self.outcomes.into_iter().find_map(|o| o.result.err()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Persist one document, retrying store failures up to the policy limit.
pub fn persist_one(
    doc: &SignedDocument,
    store: &dyn MetadataStore,
    policy: RetryPolicy,
) -> PersistOutcome {
    let max = policy.max_attempts.max(1);
    let mut attempts = 0;
    let result = loop {
        attempts += 1;
        match store.store(&doc.role, &doc.json) {
            Ok(()) => break Ok(()),
            Err(e) => {
                let e = match e {
                    e @ HashbinError::Persistence { .. } => e,
                    other => HashbinError::persistence(&doc.role, other.to_string()),
                };
                if attempts >= max {
                    break Err(e);
                }
                tracing::warn!(role = %doc.role, attempts, error = %e, "store failed, retrying");
            }
        }
    };

    match &result {
        Ok(()) => tracing::info!(role = %doc.role, attempts, "stored document"),
        Err(e) => tracing::warn!(role = %doc.role, attempts, error = %e, "giving up on document"),
    }

    PersistOutcome {
        role: doc.role.clone(),
        attempts,
        result,
    }
}

/// Persist every document independently.
pub fn persist_all(
    docs: &[SignedDocument],
    store: &dyn MetadataStore,
    policy: RetryPolicy,
) -> PersistReport {
    PersistReport {
        outcomes: docs.iter().map(|d| persist_one(d, store, policy)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Fails each role a configured number of times before accepting it.
    #[derive(Default)]
    struct ScriptedStore {
        failures: Mutex<BTreeMap<String, u32>>,
        written: Mutex<Vec<String>>,
    }

    impl MetadataStore for ScriptedStore {
        fn store(&self, role: &str, _bytes: &[u8]) -> HashbinResult<()> {
            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(role) {
                if *left > 0 {
                    *left -= 1;
                    return Err(HashbinError::persistence(role, "disk full"));
                }
            }
            self.written.lock().unwrap().push(role.to_string());
            Ok(())
        }
    }

    fn docs(roles: &[&str]) -> Vec<SignedDocument> {
        roles
            .iter()
            .map(|r| SignedDocument {
                role: r.to_string(),
                json: b"{}".to_vec(),
            })
            .collect()
    }

    #[test]
    fn transient_failures_are_retried() {
        let store = ScriptedStore::default();
        store.failures.lock().unwrap().insert("00-7f".into(), 2);

        let report = persist_all(&docs(&["bins", "00-7f"]), &store, RetryPolicy::default());
        assert!(report.is_complete());
        assert_eq!(report.outcomes[1].attempts, 3);
        assert_eq!(store.written.lock().unwrap().len(), 2);
    }

    #[test]
    fn partial_failure_is_visible_per_document() {
        let store = ScriptedStore::default();
        store.failures.lock().unwrap().insert("80-ff".into(), 10);

        let report = persist_all(
            &docs(&["bins", "00-7f", "80-ff"]),
            &store,
            RetryPolicy::default(),
        );
        assert!(!report.is_complete());
        assert_eq!(report.stored().collect::<Vec<_>>(), ["bins", "00-7f"]);
        let failed: Vec<&str> = report.failed().map(|(r, _)| r).collect();
        assert_eq!(failed, ["80-ff"]);
        assert_eq!(report.outcomes[2].attempts, 3);
        assert!(report.into_result().is_err());
    }

    #[test]
    fn no_retry_policy_tries_once() {
        let store = ScriptedStore::default();
        store.failures.lock().unwrap().insert("bins".into(), 1);
        let report = persist_all(&docs(&["bins"]), &store, RetryPolicy::no_retry());
        assert_eq!(report.outcomes[0].attempts, 1);
        assert!(!report.is_complete());
    }
}
