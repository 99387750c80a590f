//! Snapshot document and its sled-backed store.
//!
//! The whole marketplace lives in one document under one key, read in full
//! and written in full. That keeps every mutation a single atomic write and
//! means no reader can ever observe some collections updated and others
//! stale relative to one transition.
use crate::entity::{Booking, Category, JobRequest, Offer};
use std::convert::Infallible;
use std::sync::Arc;

const DOCUMENT_KEY: &[u8] = b"document/v1";

/// Full in-memory representation of all entity collections at a point in
/// time. Insertion order within a collection is creation order and carries
/// no other meaning.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Default, Clone, PartialEq)]
pub struct Snapshot {
    #[n(0)]
    pub categories: Vec<Category>,
    #[n(1)]
    pub job_requests: Vec<JobRequest>,
    #[n(2)]
    pub offers: Vec<Offer>,
    #[n(3)]
    pub bookings: Vec<Booking>,
}

impl Snapshot {
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }
    pub fn job_request(&self, id: &str) -> Option<&JobRequest> {
        self.job_requests.iter().find(|r| r.id == id)
    }
    pub fn offer(&self, id: &str) -> Option<&Offer> {
        self.offers.iter().find(|o| o.id == id)
    }
    pub fn booking(&self, id: &str) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage medium failure: {0}")]
    Medium(#[from] sled::Error),
    #[error("document encode failed: {0}")]
    Encode(#[from] minicbor::encode::Error<Infallible>),
    #[error("document decode failed: {0}")]
    Decode(#[from] minicbor::decode::Error),
}

pub struct SnapshotStore {
    instance: Arc<sled::Db>,
    seed: Snapshot,
}

impl SnapshotStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self {
            instance,
            seed: Snapshot::default(),
        }
    }

    /// A store that initializes the document from `seed` on first load.
    /// Reference data (categories) normally arrives this way.
    pub fn with_seed(instance: Arc<sled::Db>, seed: Snapshot) -> Self {
        Self { instance, seed }
    }

    /// Read the current document. On first use the seed is persisted before
    /// it is returned, so a crash right after startup replays identically.
    pub fn load(&self) -> Result<Snapshot, StoreError> {
        self.load_inner()
            .inspect_err(|e| tracing::error!(error = %e, "document read failed"))
    }

    /// Atomically overwrite the durable document. Full-document write plus
    /// flush; there is no incremental update path.
    pub fn replace(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        self.replace_inner(snapshot)
            .inspect_err(|e| tracing::error!(error = %e, "full-document write failed"))
    }

    fn load_inner(&self) -> Result<Snapshot, StoreError> {
        match self.instance.get(DOCUMENT_KEY)? {
            Some(bytes) => Ok(minicbor::decode(&bytes)?),
            None => {
                self.replace_inner(&self.seed)?;
                Ok(self.seed.clone())
            }
        }
    }

    fn replace_inner(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = minicbor::to_vec(snapshot)?;
        self.instance.insert(DOCUMENT_KEY, bytes)?;
        self.instance.flush()?;
        Ok(())
    }
}
