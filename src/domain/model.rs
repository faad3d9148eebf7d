use crate::utils::error::{ClientError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 後端回應的外層結構 `{status, data, message?}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: ResponseStatus,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<u64>,
}

impl<T> Envelope<T> {
    /// 204 或空 body 的成功回應
    pub fn empty() -> Self {
        Self {
            status: ResponseStatus::Success,
            data: None,
            message: None,
            results: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    pub fn into_data(self) -> Result<T> {
        self.data.ok_or_else(|| ClientError::FailError {
            message: self
                .message
                .unwrap_or_else(|| "Response did not include data".to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Fail,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    #[default]
    User,
    Guide,
    LeadGuide,
    Admin,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Range {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// 推薦用的偏好設定，每個界限都可省略
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Range::is_empty")]
    pub price: Range,
    #[serde(rename = "engineCC", default, skip_serializing_if = "Range::is_empty")]
    pub engine_cc: Range,
    #[serde(default, skip_serializing_if = "Range::is_empty")]
    pub weight: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bike {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "engineCC", default)]
    pub engine_cc: f64,
    #[serde(default)]
    pub weight: f64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub ratings_average: f64,
    #[serde(default)]
    pub ratings_quantity: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl Bike {
    /// 有折扣時顯示的原價（價格 + 折扣）
    pub fn original_price(&self) -> Option<f64> {
        self.price_discount
            .filter(|discount| *discount > 0.0)
            .map(|discount| self.price + discount)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_bikes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_users: Option<u64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// 預約中的 bike/user 可能是 id 字串，也可能是 populate 後的物件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference<T> {
    Id(String),
    Populated(T),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub bike: Reference<Bike>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Reference<User>>,
    #[serde(default)]
    pub pickup_location: String,
    #[serde(default)]
    pub drop_location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Booking {
    pub fn bike_id(&self) -> &str {
        match &self.bike {
            Reference::Id(id) => id,
            Reference::Populated(bike) => &bike.id,
        }
    }
}

// data 內的具名欄位，例如 `{"data": {"user": {...}}}`

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserData {
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersData {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BikeData {
    pub bike: Bike,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BikesData {
    pub bikes: Vec<Bike>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsData {
    pub stats: BikeStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingData {
    pub booking: Booking,
}

/// `/users/me` 回傳的使用者資料，預約清單可能不存在
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileData {
    pub user: User,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}
