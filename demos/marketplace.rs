//! End-to-end walkthrough of the booking workflow against a local sled db.
//!
//! Document location comes from DATA_PATH (defaults to ./data/marketplace.db),
//! mirroring how the embedding process is expected to configure the store.

use std::sync::Arc;

use job_marketplace::{
    actor::{Actor, Role},
    entity::{BookingStatus, Category, JobRequestDraft, OfferDraft, PricingMode, TimeStamp},
    service::MarketplaceService,
    store::{Snapshot, SnapshotStore},
    utils,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let data_path =
        std::env::var("DATA_PATH").unwrap_or_else(|_| "./data/marketplace.db".to_string());
    let db = Arc::new(sled::open(&data_path)?);
    db.clear()?; // fresh walkthrough on every run

    let seed = Snapshot {
        categories: vec![Category {
            id: "cat-cleaning".into(),
            name: "Cleaning".into(),
            is_prohibited: false,
            requires_verification: false,
            active: true,
        }],
        ..Snapshot::default()
    };
    let service = MarketplaceService::new(SnapshotStore::with_seed(db, seed));

    let customer = Actor::new(utils::new_uuid_to_bech32("user_")?, Role::Customer);
    let provider_one = Actor::new(utils::new_uuid_to_bech32("user_")?, Role::Provider);
    let provider_two = Actor::new(utils::new_uuid_to_bech32("user_")?, Role::Provider);

    let request = service.create_job_request(
        &customer,
        &JobRequestDraft::new()
            .set_category("cat-cleaning")
            .set_title("Deep clean")
            .set_description("Two bed flat, kitchen included")
            .set_pricing_mode(PricingMode::Fixed)
            .set_budget_min(30)
            .set_budget_max(60)
            .set_location_text("Leeds LS1")
            .set_location(53.8, -1.55)
            .set_window_start(TimeStamp::new_with(2025, 6, 1, 9, 0, 0))
            .set_window_end(TimeStamp::new_with(2025, 6, 1, 17, 0, 0)),
    )?;
    println!("request {} is {}", request.id, request.status.as_str());

    let offer_one = service.create_offer(
        &provider_one,
        &OfferDraft::new()
            .set_job_request(&request.id)
            .set_message("Can do Saturday morning")
            .set_proposed_price(40),
    )?;
    let _offer_two = service.create_offer(
        &provider_two,
        &OfferDraft::new()
            .set_job_request(&request.id)
            .set_proposed_price(35),
    )?;

    let booking = service.accept_offer(&customer, &offer_one.id)?;
    println!(
        "booking {} confirmed at price {:?}",
        booking.id, booking.agreed_price
    );

    for offer in service.list_offers_for_request(&request.id)? {
        println!("offer {} is now {}", offer.id, offer.status.as_str());
    }

    service.update_booking_status(&provider_one, &booking.id, BookingStatus::EnRoute)?;
    service.update_booking_status(&provider_one, &booking.id, BookingStatus::InProgress)?;
    let done = service.update_booking_status(&customer, &booking.id, BookingStatus::Completed)?;
    println!("booking {} finished as {}", done.id, done.status.as_str());

    Ok(())
}
