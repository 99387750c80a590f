//! Service layer API for marketplace workflow operations.
//!
//! `MarketplaceService` is the only writer of the snapshot store. Every
//! mutating operation runs its whole read-validate-mutate-write cycle while
//! holding the write gate, and lands all of its effects in one `replace`
//! call, so callers either see the full transition or none of it.
use crate::actor::{Actor, Role, require_role};
use crate::entity::{
    Booking, BookingStatus, Category, JobRequest, JobRequestDraft, JobRequestStatus, Offer,
    OfferDraft, OfferStatus, TimeStamp,
};
use crate::error::WorkflowError;
use crate::store::SnapshotStore;
use crate::{utils, validate};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(2);

/// Optional projection filters for the job request listing.
#[derive(Debug, Default, Clone)]
pub struct JobRequestFilter {
    pub status: Option<JobRequestStatus>,
    pub category_id: Option<String>,
}

pub struct MarketplaceService {
    store: SnapshotStore,
    // single exclusion domain scoped to the whole document
    gate: Mutex<()>,
    gate_timeout: Duration,
}

impl MarketplaceService {
    pub fn new(store: SnapshotStore) -> Self {
        Self::with_gate_timeout(store, DEFAULT_GATE_TIMEOUT)
    }

    /// Bound the wait for the write gate; expiry fails with `ResourceBusy`.
    pub fn with_gate_timeout(store: SnapshotStore, gate_timeout: Duration) -> Self {
        Self {
            store,
            gate: Mutex::new(()),
            gate_timeout,
        }
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, WorkflowError> {
        let deadline = Instant::now() + self.gate_timeout;
        loop {
            match self.gate.try_lock() {
                Ok(guard) => return Ok(guard),
                // a poisoned gate is recoverable: no cycle leaves partial
                // state behind, everything lands in one replace
                Err(TryLockError::Poisoned(poisoned)) => return Ok(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(WorkflowError::ResourceBusy);
                    }
                    thread::sleep(Duration::from_millis(1));
                }
            }
        }
    }

    /// Post a new job request. Customer only; the referenced category must
    /// exist, be active and not prohibited.
    pub fn create_job_request(
        &self,
        actor: &Actor,
        draft: &JobRequestDraft,
    ) -> Result<JobRequest, WorkflowError> {
        require_role(actor, &[Role::Customer])?;

        let row = validate::job_request(
            draft,
            utils::fresh_id("jr"),
            actor.user_id.clone(),
            TimeStamp::now(),
        )?;

        let _gate = self.acquire()?;
        let mut snapshot = self.store.load()?;

        let category = snapshot.category(&row.category_id).ok_or_else(|| {
            WorkflowError::InvalidReference(format!("category {} does not exist", row.category_id))
        })?;
        // seed data arrives out-of-band, hold it to the same record contract
        validate::category_record(category)?;
        if !category.active {
            return Err(WorkflowError::PolicyViolation(format!(
                "category {} is inactive",
                category.id
            )));
        }
        if category.is_prohibited {
            return Err(WorkflowError::PolicyViolation(format!(
                "category {} is prohibited",
                category.id
            )));
        }

        snapshot.job_requests.push(row.clone());
        self.store.replace(&snapshot)?;

        tracing::debug!(job_request = %row.id, customer = %row.customer_id, "job request created");
        Ok(row)
    }

    /// Respond to an open job request with an offer. Provider only.
    pub fn create_offer(&self, actor: &Actor, draft: &OfferDraft) -> Result<Offer, WorkflowError> {
        require_role(actor, &[Role::Provider])?;

        let row = validate::offer(
            draft,
            utils::fresh_id("of"),
            actor.user_id.clone(),
            TimeStamp::now(),
        )?;

        let _gate = self.acquire()?;
        let mut snapshot = self.store.load()?;

        let request = snapshot.job_request(&row.job_request_id).ok_or_else(|| {
            WorkflowError::NotFound(format!("job request {}", row.job_request_id))
        })?;
        if request.status != JobRequestStatus::Open {
            return Err(WorkflowError::InvalidState(format!(
                "job request {} is not open",
                request.id
            )));
        }

        snapshot.offers.push(row.clone());
        self.store.replace(&snapshot)?;

        tracing::debug!(offer = %row.id, job_request = %row.job_request_id, "offer created");
        Ok(row)
    }

    /// Accept one offer on an open job request the actor owns. In a single
    /// atomic transition: the target offer becomes Accepted, every other
    /// Sent offer on the request becomes Rejected, the request becomes
    /// Booked and exactly one Confirmed booking is created.
    pub fn accept_offer(&self, actor: &Actor, offer_id: &str) -> Result<Booking, WorkflowError> {
        require_role(actor, &[Role::Customer])?;

        let _gate = self.acquire()?;
        let mut snapshot = self.store.load()?;

        let offer = snapshot
            .offer(offer_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("offer {offer_id}")))?;

        let request = match snapshot.job_request(&offer.job_request_id) {
            Some(r) => r.clone(),
            None => {
                // an offer without its parent request is a data-integrity fault
                tracing::error!(
                    offer = %offer.id,
                    job_request = %offer.job_request_id,
                    "offer references a missing job request"
                );
                return Err(WorkflowError::NotFound(format!(
                    "job request {}",
                    offer.job_request_id
                )));
            }
        };

        if request.customer_id != actor.user_id {
            return Err(WorkflowError::AuthorizationDenied(
                "not the owner of this job request".into(),
            ));
        }
        if request.status != JobRequestStatus::Open {
            return Err(WorkflowError::InvalidState(format!(
                "job request {} is not open",
                request.id
            )));
        }

        let booking = Booking {
            id: utils::fresh_id("bk"),
            job_request_id: request.id.clone(),
            offer_id: offer.id.clone(),
            customer_id: request.customer_id.clone(),
            provider_id: offer.provider_id.clone(),
            agreed_price: offer.proposed_price.or(offer.hourly_rate),
            pricing_mode: request.pricing_mode,
            status: BookingStatus::Confirmed,
            created_at: TimeStamp::now(),
        };
        validate::booking_record(&booking)?;

        // all four effects land in the same snapshot
        for o in snapshot
            .offers
            .iter_mut()
            .filter(|o| o.job_request_id == request.id)
        {
            if o.id == offer.id {
                o.status = OfferStatus::Accepted;
            } else if o.status == OfferStatus::Sent {
                o.status = OfferStatus::Rejected;
            }
        }
        for r in snapshot
            .job_requests
            .iter_mut()
            .filter(|r| r.id == request.id)
        {
            r.status = JobRequestStatus::Booked;
        }

        // re-verify the rewritten rows before they re-enter the store
        for o in snapshot
            .offers
            .iter()
            .filter(|o| o.job_request_id == request.id)
        {
            validate::offer_record(o)?;
        }
        for r in snapshot.job_requests.iter().filter(|r| r.id == request.id) {
            validate::job_request_record(r)?;
        }
        snapshot.bookings.push(booking.clone());

        self.store.replace(&snapshot)?;

        tracing::debug!(
            booking = %booking.id,
            offer = %offer.id,
            job_request = %request.id,
            "offer accepted, booking created"
        );
        Ok(booking)
    }

    /// Move a booking along its state machine. Allowed for an admin or for
    /// either party to the booking; out-of-order and terminal-state
    /// transitions are refused.
    pub fn update_booking_status(
        &self,
        actor: &Actor,
        booking_id: &str,
        next: BookingStatus,
    ) -> Result<Booking, WorkflowError> {
        let _gate = self.acquire()?;
        let mut snapshot = self.store.load()?;

        let booking = snapshot
            .booking(booking_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("booking {booking_id}")))?;

        let is_party =
            booking.customer_id == actor.user_id || booking.provider_id == actor.user_id;
        if actor.role != Role::Admin && !is_party {
            return Err(WorkflowError::AuthorizationDenied(
                "not a party to this booking".into(),
            ));
        }
        if !booking.status.can_transition_to(next) {
            return Err(WorkflowError::InvalidState(format!(
                "booking {} cannot move {} -> {}",
                booking.id,
                booking.status.as_str(),
                next.as_str()
            )));
        }

        let mut row = booking;
        row.status = next;
        validate::booking_record(&row)?;
        for b in snapshot.bookings.iter_mut().filter(|b| b.id == row.id) {
            b.status = next;
        }
        self.store.replace(&snapshot)?;

        tracing::debug!(booking = %row.id, status = row.status.as_str(), "booking status updated");
        Ok(row)
    }

    /// Cancel an open job request the actor owns. Every Sent offer on the
    /// request is Rejected in the same transition, so none is left dangling
    /// once the request leaves Open.
    pub fn cancel_job_request(
        &self,
        actor: &Actor,
        job_request_id: &str,
    ) -> Result<JobRequest, WorkflowError> {
        require_role(actor, &[Role::Customer])?;

        let _gate = self.acquire()?;
        let mut snapshot = self.store.load()?;

        let request = snapshot
            .job_request(job_request_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("job request {job_request_id}")))?;
        if request.customer_id != actor.user_id {
            return Err(WorkflowError::AuthorizationDenied(
                "not the owner of this job request".into(),
            ));
        }
        if request.status != JobRequestStatus::Open {
            return Err(WorkflowError::InvalidState(format!(
                "job request {} is not open",
                request.id
            )));
        }

        for o in snapshot
            .offers
            .iter_mut()
            .filter(|o| o.job_request_id == request.id && o.status == OfferStatus::Sent)
        {
            o.status = OfferStatus::Rejected;
        }
        let mut row = request;
        row.status = JobRequestStatus::Cancelled;
        for r in snapshot.job_requests.iter_mut().filter(|r| r.id == row.id) {
            r.status = JobRequestStatus::Cancelled;
        }

        // re-verify the rewritten rows before they re-enter the store
        validate::job_request_record(&row)?;
        for o in snapshot
            .offers
            .iter()
            .filter(|o| o.job_request_id == row.id)
        {
            validate::offer_record(o)?;
        }

        self.store.replace(&snapshot)?;

        tracing::debug!(job_request = %row.id, "job request cancelled");
        Ok(row)
    }

    /// Withdraw a Sent offer the actor made, while its request is still open.
    pub fn withdraw_offer(&self, actor: &Actor, offer_id: &str) -> Result<Offer, WorkflowError> {
        require_role(actor, &[Role::Provider])?;

        let _gate = self.acquire()?;
        let mut snapshot = self.store.load()?;

        let offer = snapshot
            .offer(offer_id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("offer {offer_id}")))?;
        if offer.provider_id != actor.user_id {
            return Err(WorkflowError::AuthorizationDenied(
                "not the owner of this offer".into(),
            ));
        }

        let request = match snapshot.job_request(&offer.job_request_id) {
            Some(r) => r,
            None => {
                tracing::error!(
                    offer = %offer.id,
                    job_request = %offer.job_request_id,
                    "offer references a missing job request"
                );
                return Err(WorkflowError::NotFound(format!(
                    "job request {}",
                    offer.job_request_id
                )));
            }
        };
        if request.status != JobRequestStatus::Open {
            return Err(WorkflowError::InvalidState(format!(
                "job request {} is not open",
                request.id
            )));
        }
        if offer.status != OfferStatus::Sent {
            return Err(WorkflowError::InvalidState(format!(
                "offer {} is not sent",
                offer.id
            )));
        }

        let mut row = offer;
        row.status = OfferStatus::Withdrawn;
        validate::offer_record(&row)?;
        for o in snapshot.offers.iter_mut().filter(|o| o.id == row.id) {
            o.status = OfferStatus::Withdrawn;
        }

        self.store.replace(&snapshot)?;

        tracing::debug!(offer = %row.id, "offer withdrawn");
        Ok(row)
    }

    // Read-only projections over the current snapshot. The document is read
    // atomically as one value, so these take no gate, and they always hand
    // back copies rather than references into live state.

    pub fn list_categories(&self) -> Result<Vec<Category>, WorkflowError> {
        let snapshot = self.store.load()?;
        Ok(snapshot
            .categories
            .into_iter()
            .filter(|c| c.active)
            .collect())
    }

    pub fn list_job_requests(
        &self,
        filter: &JobRequestFilter,
    ) -> Result<Vec<JobRequest>, WorkflowError> {
        let snapshot = self.store.load()?;
        Ok(snapshot
            .job_requests
            .into_iter()
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| {
                filter
                    .category_id
                    .as_deref()
                    .is_none_or(|c| r.category_id == c)
            })
            .collect())
    }

    pub fn list_offers_for_request(
        &self,
        job_request_id: &str,
    ) -> Result<Vec<Offer>, WorkflowError> {
        let snapshot = self.store.load()?;
        if snapshot.job_request(job_request_id).is_none() {
            return Err(WorkflowError::NotFound(format!(
                "job request {job_request_id}"
            )));
        }
        Ok(snapshot
            .offers
            .into_iter()
            .filter(|o| o.job_request_id == job_request_id)
            .collect())
    }

    /// Bookings visible to the actor: everything for an admin, otherwise
    /// only bookings the actor is a party to.
    pub fn list_bookings(&self, actor: &Actor) -> Result<Vec<Booking>, WorkflowError> {
        let snapshot = self.store.load()?;
        if actor.role == Role::Admin {
            return Ok(snapshot.bookings);
        }
        Ok(snapshot
            .bookings
            .into_iter()
            .filter(|b| b.customer_id == actor.user_id || b.provider_id == actor.user_id)
            .collect())
    }
}
