//! Delegation graph construction and signing.
//!
//! A [`DelegationGraph`] owns one delegating document and one delegated
//! document per bin. It is built in three phases:
//! 1. [`DelegationGraph::build`] wires the parent's delegation record to every
//!    bin and creates the (empty) bin documents.
//! 2. [`DelegationGraph::add_artifact`] files each artifact into the single bin
//!    its path hash selects.
//! 3. [`DelegationGraph::finalize`] signs every document that is not yet signed.
//!
//! Per-document state only moves forward: `Empty -> Populated -> Signed`.
//! A signed document is frozen; attempts to mutate it fail with
//! [`HashbinError::DocumentSealed`] instead of leaving a stale signature behind.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{validate_config, DelegationConfig};
use crate::determinism::canonical_json::canonical_bytes_of;
use crate::determinism::stable_sort::ensure_strictly_ascending;
use crate::errors::{HashbinError, HashbinResult};
use crate::model::{
    ArtifactRecord, DelegatedRoleSpec, DelegatedTargets, DelegatingTargets, KeyRecord, Metadata,
    Signature,
};
use crate::partition::{find_hash_bin, generate_bins, path_prefix};
use crate::signer::MetadataSigner;

/// Signature threshold of every bin role.
pub const BIN_THRESHOLD: u32 = 1;

/// Lifecycle state of one document in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Empty,
    Populated,
    Signed,
}

#[derive(Debug, Clone)]
struct RoleDocument<T> {
    role: String,
    body: T,
    state: DocumentState,
    signatures: Vec<Signature>,
}

impl<T: Serialize + Clone> RoleDocument<T> {
    fn new(role: impl Into<String>, body: T) -> Self {
        Self {
            role: role.into(),
            body,
            state: DocumentState::Empty,
            signatures: Vec::new(),
        }
    }

    fn ensure_mutable(&self) -> HashbinResult<()> {
        if self.state == DocumentState::Signed {
            return Err(HashbinError::DocumentSealed {
                role: self.role.clone(),
            });
        }
        Ok(())
    }

    fn sign_with(&mut self, signer: &dyn MetadataSigner) -> SignOutcome {
        let status = match self.state {
            DocumentState::Signed => SignStatus::AlreadySigned,
            DocumentState::Empty | DocumentState::Populated => {
                // An empty bin is still a complete statement about its prefixes.
                self.state = DocumentState::Populated;
                match self.try_sign(signer) {
                    Ok(sig) => {
                        self.signatures.push(sig);
                        self.state = DocumentState::Signed;
                        SignStatus::Signed
                    }
                    Err(e) => SignStatus::Failed(e),
                }
            }
        };
        SignOutcome {
            role: self.role.clone(),
            status,
        }
    }

    fn try_sign(&self, signer: &dyn MetadataSigner) -> HashbinResult<Signature> {
        let bytes = canonical_bytes_of(&self.body)?;
        let sig = signer.sign(&bytes).map_err(|e| match e {
            HashbinError::Signing { reason, .. } => HashbinError::signing(&self.role, reason),
            other => HashbinError::signing(&self.role, other.to_string()),
        })?;
        if sig.keyid != signer.key_id() {
            return Err(HashbinError::signing(
                &self.role,
                format!(
                    "signer returned signature for key {} instead of {}",
                    sig.keyid,
                    signer.key_id()
                ),
            ));
        }
        Ok(sig)
    }

    fn to_signed_document(&self) -> HashbinResult<SignedDocument> {
        if self.state != DocumentState::Signed {
            return Err(HashbinError::invariant(format!(
                "document {} is not signed",
                self.role
            )));
        }
        let envelope = Metadata {
            signed: self.body.clone(),
            signatures: self.signatures.clone(),
        };
        let json = serde_json::to_vec_pretty(&envelope).map_err(|e| {
            HashbinError::serialization(format!("failed to encode {}: {e}", self.role))
        })?;
        Ok(SignedDocument {
            role: self.role.clone(),
            json,
        })
    }
}

/// Result of attempting to sign one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignStatus {
    Signed,
    AlreadySigned,
    Failed(HashbinError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutcome {
    pub role: String,
    pub status: SignStatus,
}

/// Per-document outcomes of a [`DelegationGraph::finalize`] call.
#[derive(Debug, Clone, Default)]
pub struct FinalizeReport {
    pub outcomes: Vec<SignOutcome>,
}

impl FinalizeReport {
    /// True if no document failed to sign.
    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &HashbinError)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            SignStatus::Failed(e) => Some((o.role.as_str(), e)),
            _ => None,
        })
    }

    /// Number of documents signed by this call.
    pub fn newly_signed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == SignStatus::Signed)
            .count()
    }
}

/// A signed document encoded for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDocument {
    pub role: String,
    /// Pretty-printed JSON of the `{signed, signatures}` envelope.
    pub json: Vec<u8>,
}

/// The delegating document, its bins, and their signing state.
#[derive(Debug, Clone)]
pub struct DelegationGraph {
    config: DelegationConfig,
    parent: RoleDocument<DelegatingTargets>,
    bins: Vec<RoleDocument<DelegatedTargets>>,
    index: BTreeMap<String, usize>,
}

impl DelegationGraph {
    /// Create the parent document and one empty document per bin.
    ///
    /// `bin_key` is the public key shared by all bin roles; it is embedded in
    /// the parent's delegation key table and listed on every role.
    pub fn build(config: &DelegationConfig, bin_key: &KeyRecord) -> HashbinResult<Self> {
        validate_config(config)?;

        let bin_key_id = bin_key.key_id()?;
        let bin_expires = config.bin_expires()?;
        let bins = generate_bins(&config.bins);
        ensure_strictly_ascending(&bins, |b| b.low())?;

        let mut parent_body =
            DelegatingTargets::new(config.spec_version.clone(), config.parent_expires()?);
        parent_body
            .delegations
            .keys
            .insert(bin_key_id.clone(), bin_key.clone());

        let mut docs = Vec::with_capacity(bins.len());
        let mut index = BTreeMap::new();
        for bin in &bins {
            parent_body.delegations.roles.push(DelegatedRoleSpec {
                name: bin.name().to_string(),
                keyids: vec![bin_key_id.clone()],
                threshold: BIN_THRESHOLD,
                terminating: false,
                path_hash_prefixes: bin.hash_prefixes().to_vec(),
            });

            index.insert(bin.name().to_string(), docs.len());
            docs.push(RoleDocument::new(
                bin.name(),
                DelegatedTargets::new(config.spec_version.clone(), bin_expires.clone()),
            ));
        }

        let mut parent = RoleDocument::new(config.parent_role.clone(), parent_body);
        parent.state = DocumentState::Populated;

        tracing::info!(
            parent = %config.parent_role,
            bins = docs.len(),
            bin_key = %bin_key_id,
            "built hash bin delegation"
        );

        Ok(Self {
            config: config.clone(),
            parent,
            bins: docs,
            index,
        })
    }

    pub fn config(&self) -> &DelegationConfig {
        &self.config
    }

    /// Role name of the delegating document.
    pub fn parent_role(&self) -> &str {
        &self.parent.role
    }

    pub fn parent(&self) -> &DelegatingTargets {
        &self.parent.body
    }

    pub fn bin(&self, name: &str) -> Option<&DelegatedTargets> {
        self.index.get(name).map(|&i| &self.bins[i].body)
    }

    /// Bin names in delegation order.
    pub fn bins(&self) -> impl Iterator<Item = &str> {
        self.bins.iter().map(|d| d.role.as_str())
    }

    pub fn state_of(&self, role: &str) -> Option<DocumentState> {
        if role == self.parent.role {
            return Some(self.parent.state);
        }
        self.index.get(role).map(|&i| self.bins[i].state)
    }

    pub fn signatures_of(&self, role: &str) -> Option<&[Signature]> {
        if role == self.parent.role {
            return Some(&self.parent.signatures);
        }
        self.index.get(role).map(|&i| self.bins[i].signatures.as_slice())
    }

    /// Total number of artifacts across all bins.
    pub fn artifact_count(&self) -> usize {
        self.bins.iter().map(|d| d.body.targets.len()).sum()
    }

    /// Resolve the delegated role for a path the way a client does: by
    /// scanning the parent's roles for the path's hash prefix.
    pub fn role_for_path(&self, path: &str) -> HashbinResult<&DelegatedRoleSpec> {
        let width = self.config.bins.prefix_len();
        let prefix = format!("{:0width$x}", path_prefix(&self.config.bins, path)?);
        self.parent
            .body
            .delegations
            .role_for_prefix(&prefix)
            .ok_or_else(|| HashbinError::AssignmentInconsistency {
                path: path.to_string(),
                bin: prefix,
            })
    }

    /// File an artifact into its bin, replacing any previous record for `path`.
    ///
    /// Returns the name of the bin the artifact was filed into.
    pub fn add_artifact(&mut self, path: &str, record: ArtifactRecord) -> HashbinResult<String> {
        let idx = self.locate(path)?;
        let doc = &mut self.bins[idx];
        doc.ensure_mutable()?;

        let replaced = doc.body.targets.insert(path.to_string(), record).is_some();
        doc.state = DocumentState::Populated;

        tracing::debug!(path, bin = %doc.role, replaced, "assigned artifact");
        Ok(doc.role.clone())
    }

    /// File a batch of artifacts.
    ///
    /// Every path is validated and located before any insertion happens, so a
    /// rejected batch leaves the graph untouched. Bin computation runs in
    /// parallel with the `parallel` feature.
    pub fn add_artifacts<I>(&mut self, artifacts: I) -> HashbinResult<usize>
    where
        I: IntoIterator<Item = (String, ArtifactRecord)>,
    {
        let artifacts: Vec<(String, ArtifactRecord)> = artifacts.into_iter().collect();

        #[cfg(feature = "parallel")]
        let located: Vec<usize> = {
            use rayon::prelude::*;
            artifacts
                .par_iter()
                .map(|(path, _)| self.locate(path))
                .collect::<HashbinResult<Vec<_>>>()?
        };
        #[cfg(not(feature = "parallel"))]
        let located: Vec<usize> = artifacts
            .iter()
            .map(|(path, _)| self.locate(path))
            .collect::<HashbinResult<Vec<_>>>()?;

        for &idx in &located {
            self.bins[idx].ensure_mutable()?;
        }

        let count = artifacts.len();
        for ((path, record), idx) in artifacts.into_iter().zip(located) {
            let doc = &mut self.bins[idx];
            doc.body.targets.insert(path, record);
            doc.state = DocumentState::Populated;
        }

        tracing::debug!(count, "assigned artifact batch");
        Ok(count)
    }

    fn locate(&self, path: &str) -> HashbinResult<usize> {
        if path.is_empty() {
            return Err(HashbinError::invalid_argument("artifact path must not be empty"));
        }
        let name = find_hash_bin(&self.config.bins, path)?;
        self.index
            .get(&name)
            .copied()
            .ok_or_else(|| HashbinError::AssignmentInconsistency {
                path: path.to_string(),
                bin: name,
            })
    }

    /// Sign every document that is not signed yet.
    ///
    /// The parent is signed with `parent_signer`, every bin with `bin_signer`.
    /// Documents are signed independently: a failure leaves only that document
    /// unsigned, and a later call retries just the failed ones.
    ///
    /// Fails up front if `bin_signer`'s key is not the key the parent
    /// delegates to.
    pub fn finalize(
        &mut self,
        parent_signer: &dyn MetadataSigner,
        bin_signer: &dyn MetadataSigner,
    ) -> HashbinResult<FinalizeReport> {
        if !self
            .parent
            .body
            .delegations
            .keys
            .contains_key(bin_signer.key_id())
        {
            return Err(HashbinError::invalid_argument(format!(
                "bin signer key {} is not delegated to by {}",
                bin_signer.key_id(),
                self.parent.role
            )));
        }

        let mut outcomes = Vec::with_capacity(self.bins.len() + 1);
        outcomes.push(self.parent.sign_with(parent_signer));

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            let bin_outcomes: Vec<SignOutcome> = self
                .bins
                .par_iter_mut()
                .map(|doc| doc.sign_with(bin_signer))
                .collect();
            outcomes.extend(bin_outcomes);
        }
        #[cfg(not(feature = "parallel"))]
        outcomes.extend(self.bins.iter_mut().map(|doc| doc.sign_with(bin_signer)));

        let report = FinalizeReport { outcomes };
        for (role, err) in report.failed() {
            tracing::warn!(role, error = %err, "document left unsigned");
        }
        tracing::info!(
            signed = report.newly_signed(),
            failed = report.failed().count(),
            "finalized delegation"
        );
        Ok(report)
    }

    /// True once every document carries its signature.
    pub fn is_fully_signed(&self) -> bool {
        self.parent.state == DocumentState::Signed
            && self.bins.iter().all(|d| d.state == DocumentState::Signed)
    }

    /// Encode every document for persistence: parent first, then bins in
    /// delegation order.
    ///
    /// Fails if any document is still unsigned.
    pub fn signed_documents(&self) -> HashbinResult<Vec<SignedDocument>> {
        let mut out = Vec::with_capacity(self.bins.len() + 1);
        out.push(self.parent.to_signed_document()?);
        for doc in &self.bins {
            out.push(doc.to_signed_document()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinConfig;
    use crate::signer::Ed25519Signer;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::datetime;
    use time::Duration;

    fn config(n: u32) -> DelegationConfig {
        DelegationConfig::new(BinConfig::new(n).unwrap(), datetime!(2024-01-01 00:00 UTC))
    }

    fn signers() -> (Ed25519Signer, Ed25519Signer) {
        (
            Ed25519Signer::generate().unwrap(),
            Ed25519Signer::generate().unwrap(),
        )
    }

    /// Fails the first `failures` calls, then delegates.
    struct FlakySigner<'a> {
        inner: &'a Ed25519Signer,
        failures: AtomicUsize,
    }

    impl MetadataSigner for FlakySigner<'_> {
        fn key_id(&self) -> &str {
            self.inner.key_id()
        }

        fn sign(&self, canonical: &[u8]) -> HashbinResult<Signature> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(HashbinError::signing("", "hsm unavailable"));
            }
            self.inner.sign(canonical)
        }
    }

    #[test]
    fn build_wires_every_bin() {
        let (_, bin) = signers();
        let g = DelegationGraph::build(&config(32), &bin.key_record()).unwrap();

        let roles = &g.parent().delegations.roles;
        assert_eq!(roles.len(), 32);
        assert_eq!(roles[0].name, "00-07");
        assert_eq!(roles[16].name, "80-87");
        assert!(roles.iter().all(|r| r.threshold == 1 && !r.terminating));
        assert!(roles.iter().all(|r| r.keyids == vec![bin.key_id().to_string()]));
        assert!(g.parent().delegations.keys.contains_key(bin.key_id()));
        assert!(g.parent().targets.is_empty());

        assert_eq!(g.state_of("bins"), Some(DocumentState::Populated));
        assert_eq!(g.state_of("80-87"), Some(DocumentState::Empty));
        assert_eq!(g.state_of("nope"), None);
        assert_eq!(g.bin("80-87").unwrap().expires, "2024-01-08T00:00:00Z");
        assert_eq!(g.parent().expires, "2024-12-31T00:00:00Z");
    }

    #[test]
    fn artifact_lands_in_its_bin_only() {
        let (_, bin) = signers();
        let mut g = DelegationGraph::build(&config(32), &bin.key_record()).unwrap();

        let path = "repo_example/hashed_bin_delegation.py";
        let name = g.add_artifact(path, ArtifactRecord::from_bytes(b"x")).unwrap();
        assert_eq!(name, "80-87");
        assert!(g.bin("80-87").unwrap().targets.contains_key(path));
        assert_eq!(g.artifact_count(), 1);
        assert_eq!(g.state_of("80-87"), Some(DocumentState::Populated));
        assert_eq!(g.state_of("00-07"), Some(DocumentState::Empty));
        assert_eq!(g.role_for_path(path).unwrap().name, "80-87");
    }

    #[test]
    fn re_adding_a_path_overwrites() {
        let (_, bin) = signers();
        let mut g = DelegationGraph::build(&config(32), &bin.key_record()).unwrap();
        g.add_artifact("a/b", ArtifactRecord::from_bytes(b"v1")).unwrap();
        let name = g.add_artifact("a/b", ArtifactRecord::from_bytes(b"v22")).unwrap();
        assert_eq!(g.artifact_count(), 1);
        assert_eq!(g.bin(&name).unwrap().targets["a/b"].length, 3);
    }

    #[test]
    fn empty_path_rejected() {
        let (_, bin) = signers();
        let mut g = DelegationGraph::build(&config(32), &bin.key_record()).unwrap();
        assert_matches!(
            g.add_artifact("", ArtifactRecord::from_bytes(b"")),
            Err(HashbinError::InvalidArgument(_))
        );
    }

    #[test]
    fn bad_configuration_rejected_before_build() {
        let (_, bin) = signers();
        let huge = config(32).with_expiries(Duration::days(4_000_000), Duration::days(7));
        assert_matches!(
            DelegationGraph::build(&huge, &bin.key_record()),
            Err(HashbinError::InvalidConfiguration(_))
        );
        let unsafe_role = config(32).with_parent_role("../bins");
        assert_matches!(
            DelegationGraph::build(&unsafe_role, &bin.key_record()),
            Err(HashbinError::InvalidConfiguration(_))
        );
    }

    #[test]
    fn finalize_signs_everything_once() {
        let (parent, bin) = signers();
        let mut g = DelegationGraph::build(&config(32), &bin.key_record()).unwrap();
        g.add_artifact("x", ArtifactRecord::from_bytes(b"x")).unwrap();

        let report = g.finalize(&parent, &bin).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.newly_signed(), 33);
        assert!(g.is_fully_signed());
        assert_eq!(g.signatures_of("bins").unwrap()[0].keyid, parent.key_id());
        for name in g.bins() {
            let sigs = g.signatures_of(name).unwrap();
            assert_eq!(sigs.len(), 1);
            assert_eq!(sigs[0].keyid, bin.key_id());
        }

        let again = g.finalize(&parent, &bin).unwrap();
        assert_eq!(again.newly_signed(), 0);
        assert!(again
            .outcomes
            .iter()
            .all(|o| o.status == SignStatus::AlreadySigned));
        assert_eq!(g.signatures_of("bins").unwrap().len(), 1);
    }

    #[test]
    fn mutation_after_signing_fails_loudly() {
        let (parent, bin) = signers();
        let mut g = DelegationGraph::build(&config(32), &bin.key_record()).unwrap();
        g.finalize(&parent, &bin).unwrap();

        assert_matches!(
            g.add_artifact("late", ArtifactRecord::from_bytes(b"late")),
            Err(HashbinError::DocumentSealed { .. })
        );
        assert_matches!(
            g.add_artifacts(vec![("late".to_string(), ArtifactRecord::from_bytes(b"l"))]),
            Err(HashbinError::DocumentSealed { .. })
        );
        assert_eq!(g.artifact_count(), 0);
    }

    #[test]
    fn failed_signing_is_retryable_per_document() {
        let (parent, bin) = signers();
        let flaky = FlakySigner {
            inner: &bin,
            failures: AtomicUsize::new(3),
        };
        let mut g = DelegationGraph::build(&config(4), &bin.key_record()).unwrap();

        let first = g.finalize(&parent, &flaky).unwrap();
        assert!(!first.is_complete());
        assert_eq!(first.failed().count(), 3);
        assert!(first
            .failed()
            .all(|(_, e)| matches!(e, HashbinError::Signing { .. })));
        assert!(!g.is_fully_signed());
        assert!(g.signed_documents().is_err());

        let second = g.finalize(&parent, &flaky).unwrap();
        assert!(second.is_complete());
        assert_eq!(second.newly_signed(), 3);
        assert!(g.is_fully_signed());
        assert_eq!(g.signed_documents().unwrap().len(), 5);
    }

    #[test]
    fn wrong_bin_signer_rejected_up_front() {
        let (parent, bin) = signers();
        let other = Ed25519Signer::generate().unwrap();
        let mut g = DelegationGraph::build(&config(2), &bin.key_record()).unwrap();
        assert_matches!(
            g.finalize(&parent, &other),
            Err(HashbinError::InvalidArgument(_))
        );
        assert_eq!(g.state_of("bins"), Some(DocumentState::Populated));
    }

    #[test]
    fn batch_assignment_matches_single() {
        let (_, bin) = signers();
        let mut a = DelegationGraph::build(&config(64), &bin.key_record()).unwrap();
        let mut b = a.clone();

        let items: Vec<(String, ArtifactRecord)> = (0..200)
            .map(|i| (format!("pkg/{i}.tar.gz"), ArtifactRecord::from_bytes(&[i as u8])))
            .collect();
        for (p, r) in &items {
            a.add_artifact(p, r.clone()).unwrap();
        }
        assert_eq!(b.add_artifacts(items).unwrap(), 200);

        for name in a.bins() {
            assert_eq!(a.bin(name), b.bin(name));
        }
    }

    #[test]
    fn batch_with_empty_path_inserts_nothing() {
        let (_, bin) = signers();
        let mut g = DelegationGraph::build(&config(8), &bin.key_record()).unwrap();
        let items = vec![
            ("ok".to_string(), ArtifactRecord::from_bytes(b"1")),
            (String::new(), ArtifactRecord::from_bytes(b"2")),
        ];
        assert!(g.add_artifacts(items).is_err());
        assert_eq!(g.artifact_count(), 0);
    }

    #[test]
    fn signed_documents_in_delegation_order() {
        let (parent, bin) = signers();
        let mut g = DelegationGraph::build(&config(16), &bin.key_record()).unwrap();
        g.finalize(&parent, &bin).unwrap();

        let docs = g.signed_documents().unwrap();
        assert_eq!(docs[0].role, "bins");
        let names: Vec<&str> = docs[1..].iter().map(|d| d.role.as_str()).collect();
        assert_eq!(names, g.bins().collect::<Vec<_>>());

        let v: serde_json::Value = serde_json::from_slice(&docs[0].json).unwrap();
        assert_eq!(v["signed"]["delegations"]["roles"].as_array().unwrap().len(), 16);
        assert_eq!(v["signatures"].as_array().unwrap().len(), 1);
    }
}
