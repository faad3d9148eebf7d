use crate::core::api::ApiClient;
use crate::domain::model::{Booking, BookingData, ProfileData};
use crate::utils::error::Result;
use crate::utils::forms::BookingForm;
use crate::utils::validation::validate_non_empty_string;

#[derive(Clone)]
pub struct BookingsService {
    api: ApiClient,
}

impl BookingsService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create_booking(&self, booking: &BookingForm) -> Result<Booking> {
        let envelope = self.api.post::<BookingData, _>(&["bookings"], booking).await?;
        Ok(envelope.into_data()?.booking)
    }

    /// 取消預約；後端可能不回傳更新後的預約
    pub async fn cancel_booking(&self, id: &str) -> Result<Option<Booking>> {
        validate_non_empty_string("id", id)?;
        let envelope = self
            .api
            .patch_empty::<BookingData>(&["bookings", "cancel", id])
            .await?;
        Ok(envelope.data.map(|data| data.booking))
    }

    /// 後端沒有獨立的「我的預約」端點，預約資料跟著 `/users/me` 一起回傳
    pub async fn get_user_bookings(&self) -> Result<ProfileData> {
        let envelope = self.api.get::<ProfileData>(&["users", "me"]).await?;
        envelope.into_data()
    }
}
