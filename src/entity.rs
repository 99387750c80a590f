//! Core marketplace entities, status machines and inbound drafts
use crate::error::WorkflowError;
use chrono::{DateTime, TimeZone, Utc};
use std::str::FromStr;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum PricingMode {
    #[n(0)]
    Fixed,
    #[n(1)]
    Hourly,
    #[n(2)]
    Quote,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum JobRequestStatus {
    #[n(0)]
    Open,
    #[n(1)]
    Booked,
    #[n(2)]
    Completed,
    #[n(3)]
    Cancelled,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum OfferStatus {
    #[n(0)]
    Sent,
    #[n(1)]
    Accepted,
    #[n(2)]
    Rejected,
    #[n(3)]
    Withdrawn,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Sent => "SENT",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::Withdrawn => "WITHDRAWN",
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum BookingStatus {
    #[n(0)]
    Confirmed,
    #[n(1)]
    EnRoute,
    #[n(2)]
    InProgress,
    #[n(3)]
    Completed,
    #[n(4)]
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Legal successor set of the booking state machine. Anything outside of
    /// this is an out-of-order transition and must be refused.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Confirmed, EnRoute)
                | (Confirmed, Cancelled)
                | (EnRoute, InProgress)
                | (EnRoute, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::EnRoute => "EN_ROUTE",
            BookingStatus::InProgress => "IN_PROGRESS",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = WorkflowError;

    // wire names as the transport sends them
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "EN_ROUTE" => Ok(BookingStatus::EnRoute),
            "IN_PROGRESS" => Ok(BookingStatus::InProgress),
            "COMPLETED" => Ok(BookingStatus::Completed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(WorkflowError::validation(format!(
                "unknown booking status {other:?}"
            ))),
        }
    }
}

impl JobRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobRequestStatus::Open => "OPEN",
            JobRequestStatus::Booked => "BOOKED",
            JobRequestStatus::Completed => "COMPLETED",
            JobRequestStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for JobRequestStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(JobRequestStatus::Open),
            "BOOKED" => Ok(JobRequestStatus::Booked),
            "COMPLETED" => Ok(JobRequestStatus::Completed),
            "CANCELLED" => Ok(JobRequestStatus::Cancelled),
            other => Err(WorkflowError::validation(format!(
                "unknown job request status {other:?}"
            ))),
        }
    }
}

/// Point on the globe attached to a job request. Carried for display and
/// future matching only, the engine never ranks by it.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    #[n(0)]
    pub lat: f64,
    #[n(1)]
    pub lng: f64,
}

#[derive(Debug, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl<T: TimeZone> PartialEq for TimeStamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: TimeZone> Eq for TimeStamp<T> {}

impl<T: TimeZone> PartialOrd for TimeStamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: TimeZone> Ord for TimeStamp<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimeStamp<Utc> {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Reference data, seeded out-of-band. The engine reads these but never
/// creates or mutates one.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Category {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub is_prohibited: bool,
    #[n(3)]
    pub requires_verification: bool,
    #[n(4)]
    pub active: bool,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct JobRequest {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub customer_id: String,
    #[n(2)]
    pub category_id: String,
    #[n(3)]
    pub title: String,
    #[n(4)]
    pub description: String,
    #[n(5)]
    pub pricing_mode: PricingMode,
    // monetary amounts are integer minor units
    #[n(6)]
    pub budget_min: Option<u64>,
    #[n(7)]
    pub budget_max: Option<u64>,
    #[n(8)]
    pub location_text: String,
    #[n(9)]
    pub location: GeoPoint,
    #[n(10)]
    pub window_start: TimeStamp<Utc>,
    #[n(11)]
    pub window_end: TimeStamp<Utc>,
    #[n(12)]
    pub status: JobRequestStatus,
    #[n(13)]
    pub created_at: TimeStamp<Utc>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Offer {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub job_request_id: String,
    #[n(2)]
    pub provider_id: String,
    #[n(3)]
    pub message: String,
    #[n(4)]
    pub proposed_price: Option<u64>,
    #[n(5)]
    pub hourly_rate: Option<u64>,
    #[n(6)]
    pub status: OfferStatus,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
}

/// Created exactly once per job request, as a side effect of accepting an
/// offer. Foreign keys are frozen at creation, only `status` moves afterwards.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Booking {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub job_request_id: String,
    #[n(2)]
    pub offer_id: String,
    #[n(3)]
    pub customer_id: String,
    #[n(4)]
    pub provider_id: String,
    #[n(5)]
    pub agreed_price: Option<u64>,
    #[n(6)]
    pub pricing_mode: PricingMode,
    #[n(7)]
    pub status: BookingStatus,
    #[n(8)]
    pub created_at: TimeStamp<Utc>,
}

// Used for constructing inbound job request payloads before validation
#[derive(Debug, Default, Clone)]
pub struct JobRequestDraft {
    pub category_id: Option<String>,
    pub title: String,
    pub description: String,
    pub pricing_mode: Option<PricingMode>,
    pub budget_min: Option<u64>,
    pub budget_max: Option<u64>,
    pub location_text: String,
    pub location: Option<GeoPoint>,
    pub window_start: Option<TimeStamp<Utc>>,
    pub window_end: Option<TimeStamp<Utc>>,
}

impl JobRequestDraft {
    /// Construct a new draft, the basis for a job request payload
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_category(mut self, category_id: &str) -> Self {
        self.category_id = Some(category_id.to_owned());
        self
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }
    pub fn set_pricing_mode(mut self, mode: PricingMode) -> Self {
        self.pricing_mode = Some(mode);
        self
    }
    pub fn set_budget_min(mut self, amount: u64) -> Self {
        self.budget_min = Some(amount);
        self
    }
    pub fn set_budget_max(mut self, amount: u64) -> Self {
        self.budget_max = Some(amount);
        self
    }
    pub fn set_location_text(mut self, text: &str) -> Self {
        self.location_text = text.to_owned();
        self
    }
    pub fn set_location(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(GeoPoint { lat, lng });
        self
    }
    pub fn set_window_start(mut self, at: TimeStamp<Utc>) -> Self {
        self.window_start = Some(at);
        self
    }
    pub fn set_window_end(mut self, at: TimeStamp<Utc>) -> Self {
        self.window_end = Some(at);
        self
    }
}

// Used for constructing inbound offer payloads before validation
#[derive(Debug, Default, Clone)]
pub struct OfferDraft {
    pub job_request_id: Option<String>,
    pub message: String,
    pub proposed_price: Option<u64>,
    pub hourly_rate: Option<u64>,
}

impl OfferDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_job_request(mut self, job_request_id: &str) -> Self {
        self.job_request_id = Some(job_request_id.to_owned());
        self
    }
    pub fn set_message(mut self, message: &str) -> Self {
        self.message = message.to_owned();
        self
    }
    pub fn set_proposed_price(mut self, amount: u64) -> Self {
        self.proposed_price = Some(amount);
        self
    }
    pub fn set_hourly_rate(mut self, amount: u64) -> Self {
        self.hourly_rate = Some(amount);
        self
    }
}
