use crate::core::query::{QueryClient, QueryKey};
use crate::core::services::BookingsService;
use crate::domain::model::{Booking, ProfileData};
use crate::utils::error::Result;
use crate::utils::forms::BookingForm;
use crate::utils::validation::Validate;
use std::sync::Arc;
use std::time::Duration;

pub fn user_root() -> QueryKey {
    QueryKey::new("user")
}

pub fn bookings_root() -> QueryKey {
    QueryKey::new("bookings")
}

pub fn my_bookings_key() -> QueryKey {
    bookings_root().push("me")
}

#[derive(Clone)]
pub struct BookingQueries {
    service: BookingsService,
    client: Arc<QueryClient>,
}

impl BookingQueries {
    pub fn new(service: BookingsService, client: Arc<QueryClient>) -> Self {
        Self { service, client }
    }

    /// 目前使用者與其預約
    pub async fn my_bookings(&self) -> Result<ProfileData> {
        let options = self.client.options().stale_time(Duration::ZERO);
        self.client
            .fetch_query(my_bookings_key(), options, || self.service.get_user_bookings())
            .await
    }

    pub async fn create_booking(&self, booking: &BookingForm) -> Result<Booking> {
        booking.validate()?;
        self.client
            .mutate(
                self.service.create_booking(booking),
                &[user_root(), bookings_root()],
                "Booking created successfully!",
                "Failed to create booking",
            )
            .await
    }

    pub async fn cancel_booking(&self, id: &str) -> Result<Option<Booking>> {
        self.client
            .mutate(
                self.service.cancel_booking(id),
                &[user_root(), bookings_root()],
                "Booking cancelled successfully!",
                "Failed to cancel booking",
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingNotifier;
    use crate::core::api::ApiClient;
    use crate::utils::error::ClientError;
    use chrono::{Duration as ChronoDuration, Utc};
    use httpmock::prelude::*;

    fn queries(server: &MockServer) -> (BookingQueries, Arc<QueryClient>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let api = ApiClient::builder(&server.url("/api/v1"))
            .notifier(notifier.clone())
            .build()
            .unwrap();
        let client = Arc::new(QueryClient::new(notifier.clone()));
        (
            BookingQueries::new(BookingsService::new(api), client.clone()),
            client,
            notifier,
        )
    }

    #[tokio::test]
    async fn test_cancel_invalidates_user_and_bookings() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH).path("/api/v1/bookings/cancel/k1");
            then.status(200).json_body(serde_json::json!({"status": "success", "data": null}));
        });

        let (bookings, client, notifier) = queries(&server);
        client.set_query_data(my_bookings_key(), 1u8);
        client.set_query_data(user_root().push("u1"), 1u8);

        let cancelled = bookings.cancel_booking("k1").await.unwrap();

        assert!(cancelled.is_none());
        assert_eq!(client.is_invalidated(&my_bookings_key()), Some(true));
        assert_eq!(client.is_invalidated(&user_root().push("u1")), Some(true));
        assert_eq!(
            notifier.successes(),
            vec!["Booking cancelled successfully!".to_string()]
        );
    }

    #[tokio::test]
    async fn test_invalid_booking_is_rejected_locally() {
        let server = MockServer::start();
        let create = server.mock(|when, then| {
            when.method(POST).path("/api/v1/bookings");
            then.status(201);
        });

        let (bookings, _, _) = queries(&server);
        let start = Utc::now() + ChronoDuration::days(3);
        let err = bookings
            .create_booking(&BookingForm {
                bike: "b1".to_string(),
                pickup_location: "Harbor".to_string(),
                drop_location: String::new(),
                start_date: Some(start),
                end_date: Some(start - ChronoDuration::days(1)),
            })
            .await
            .unwrap_err();

        match err {
            ClientError::ValidationError(errors) => {
                assert!(errors.has("dropLocation"));
                assert!(errors.has("endDate"));
            }
            other => panic!("expected validation error, got {other}"),
        }
        create.assert_hits(0);
    }
}
