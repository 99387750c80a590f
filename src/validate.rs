//! Entity validator: field-level contracts for inbound drafts and for
//! fully-formed records about to re-enter the store.
//!
//! Every function here is pure. Violations are collected into a single
//! `ValidationFailure` so the caller sees all broken constraints at once,
//! not just the first. Identity and clock are passed in by the engine, the
//! validator never mints either.
use crate::entity::{
    Booking, Category, GeoPoint, JobRequest, JobRequestDraft, JobRequestStatus, Offer, OfferDraft,
    OfferStatus, TimeStamp,
};
use crate::error::WorkflowError;
use chrono::Utc;

// minimum field lengths from the entity contracts
const MIN_NAME: usize = 2;
const MIN_TITLE: usize = 3;
const MIN_DESCRIPTION: usize = 5;
const MIN_LOCATION_TEXT: usize = 3;

fn geo_point(point: &GeoPoint, violations: &mut Vec<String>) {
    if !(-90.0..=90.0).contains(&point.lat) {
        violations.push(format!("location.lat {} out of [-90, 90]", point.lat));
    }
    if !(-180.0..=180.0).contains(&point.lng) {
        violations.push(format!("location.lng {} out of [-180, 180]", point.lng));
    }
}

fn finish(violations: Vec<String>) -> Result<(), WorkflowError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::ValidationFailure(violations))
    }
}

/// Validate a job request draft and assemble the record. The id, owner and
/// creation time come from the engine; a new request always starts `Open`.
pub fn job_request(
    draft: &JobRequestDraft,
    id: String,
    customer_id: String,
    created_at: TimeStamp<Utc>,
) -> Result<JobRequest, WorkflowError> {
    let mut violations = Vec::new();

    match &draft.category_id {
        Some(c) if !c.is_empty() => {}
        _ => violations.push("categoryId is required".into()),
    }
    if draft.title.trim().len() < MIN_TITLE {
        violations.push(format!("title must be at least {MIN_TITLE} characters"));
    }
    if draft.description.trim().len() < MIN_DESCRIPTION {
        violations.push(format!(
            "description must be at least {MIN_DESCRIPTION} characters"
        ));
    }
    if draft.pricing_mode.is_none() {
        violations.push("pricingMode is required".into());
    }
    if let (Some(min), Some(max)) = (draft.budget_min, draft.budget_max) {
        if min > max {
            violations.push(format!("budgetMin {min} exceeds budgetMax {max}"));
        }
    }
    if draft.location_text.trim().len() < MIN_LOCATION_TEXT {
        violations.push(format!(
            "locationText must be at least {MIN_LOCATION_TEXT} characters"
        ));
    }
    match &draft.location {
        Some(point) => geo_point(point, &mut violations),
        None => violations.push("location is required".into()),
    }
    match (&draft.window_start, &draft.window_end) {
        (Some(start), Some(end)) => {
            if end < start {
                violations.push("timeWindowEnd precedes timeWindowStart".into());
            }
        }
        (start, end) => {
            if start.is_none() {
                violations.push("timeWindowStart is required".into());
            }
            if end.is_none() {
                violations.push("timeWindowEnd is required".into());
            }
        }
    }

    match (
        &draft.category_id,
        draft.pricing_mode,
        draft.location,
        &draft.window_start,
        &draft.window_end,
    ) {
        (Some(category_id), Some(pricing_mode), Some(location), Some(start), Some(end))
            if violations.is_empty() =>
        {
            Ok(JobRequest {
                id,
                customer_id,
                category_id: category_id.clone(),
                title: draft.title.clone(),
                description: draft.description.clone(),
                pricing_mode,
                budget_min: draft.budget_min,
                budget_max: draft.budget_max,
                location_text: draft.location_text.clone(),
                location,
                window_start: start.clone(),
                window_end: end.clone(),
                status: JobRequestStatus::Open,
                created_at,
            })
        }
        _ => Err(WorkflowError::ValidationFailure(violations)),
    }
}

/// Validate an offer draft and assemble the record. New offers start `Sent`;
/// the message defaults to empty when the payload omits it.
pub fn offer(
    draft: &OfferDraft,
    id: String,
    provider_id: String,
    created_at: TimeStamp<Utc>,
) -> Result<Offer, WorkflowError> {
    let mut violations = Vec::new();

    match &draft.job_request_id {
        Some(j) if !j.is_empty() => {}
        _ => violations.push("jobRequestId is required".into()),
    }

    match &draft.job_request_id {
        Some(job_request_id) if violations.is_empty() => Ok(Offer {
            id,
            job_request_id: job_request_id.clone(),
            provider_id,
            message: draft.message.clone(),
            proposed_price: draft.proposed_price,
            hourly_rate: draft.hourly_rate,
            status: OfferStatus::Sent,
            created_at,
        }),
        _ => Err(WorkflowError::ValidationFailure(violations)),
    }
}

pub fn category_record(row: &Category) -> Result<(), WorkflowError> {
    let mut violations = Vec::new();
    if row.id.is_empty() {
        violations.push("category id is empty".into());
    }
    if row.name.trim().len() < MIN_NAME {
        violations.push(format!("name must be at least {MIN_NAME} characters"));
    }
    finish(violations)
}

pub fn job_request_record(row: &JobRequest) -> Result<(), WorkflowError> {
    let mut violations = Vec::new();
    if row.id.is_empty() {
        violations.push("job request id is empty".into());
    }
    if row.customer_id.is_empty() {
        violations.push("customerId is empty".into());
    }
    if row.category_id.is_empty() {
        violations.push("categoryId is empty".into());
    }
    if row.title.trim().len() < MIN_TITLE {
        violations.push(format!("title must be at least {MIN_TITLE} characters"));
    }
    if row.description.trim().len() < MIN_DESCRIPTION {
        violations.push(format!(
            "description must be at least {MIN_DESCRIPTION} characters"
        ));
    }
    if let (Some(min), Some(max)) = (row.budget_min, row.budget_max) {
        if min > max {
            violations.push(format!("budgetMin {min} exceeds budgetMax {max}"));
        }
    }
    if row.location_text.trim().len() < MIN_LOCATION_TEXT {
        violations.push(format!(
            "locationText must be at least {MIN_LOCATION_TEXT} characters"
        ));
    }
    geo_point(&row.location, &mut violations);
    if row.window_end < row.window_start {
        violations.push("timeWindowEnd precedes timeWindowStart".into());
    }
    finish(violations)
}

pub fn offer_record(row: &Offer) -> Result<(), WorkflowError> {
    let mut violations = Vec::new();
    if row.id.is_empty() {
        violations.push("offer id is empty".into());
    }
    if row.job_request_id.is_empty() {
        violations.push("jobRequestId is empty".into());
    }
    if row.provider_id.is_empty() {
        violations.push("providerId is empty".into());
    }
    finish(violations)
}

pub fn booking_record(row: &Booking) -> Result<(), WorkflowError> {
    let mut violations = Vec::new();
    if row.id.is_empty() {
        violations.push("booking id is empty".into());
    }
    if row.job_request_id.is_empty() {
        violations.push("jobRequestId is empty".into());
    }
    if row.offer_id.is_empty() {
        violations.push("offerId is empty".into());
    }
    if row.customer_id.is_empty() {
        violations.push("customerId is empty".into());
    }
    if row.provider_id.is_empty() {
        violations.push("providerId is empty".into());
    }
    finish(violations)
}
