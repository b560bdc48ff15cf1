use std::sync::Arc;
use std::time::Instant;

use crate::fulfillment::FulfillmentService;
use crate::intake::IntakeService;
use crate::listing::RequestListing;
use crate::notify::NotificationComposer;
use crate::repository::CreditRequestStore;

#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeService>,
    pub fulfillment: Arc<FulfillmentService>,
    pub listing: Arc<RequestListing>,
    pub notifier: Arc<NotificationComposer>,
    pub requests: Arc<dyn CreditRequestStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        intake: Arc<IntakeService>,
        fulfillment: Arc<FulfillmentService>,
        listing: Arc<RequestListing>,
        notifier: Arc<NotificationComposer>,
        requests: Arc<dyn CreditRequestStore>,
    ) -> Self {
        assert!(
            !intake.package_sizes().is_empty(),
            "Intake must offer at least one package"
        );
        Self {
            intake,
            fulfillment,
            listing,
            notifier,
            requests,
            start_time: Instant::now(),
        }
    }
}
