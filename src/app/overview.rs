use crate::app::queries::BikeQueries;
use crate::core::services::BikeQuery;
use crate::domain::model::{Bike, BikeStats, User};
use crate::utils::error::Result;
use crate::utils::helpers::format_currency;
use serde::Serialize;

const RECENT_BIKES_LIMIT: u32 = 6;
const FALLBACK_AVERAGE_RATING: f64 = 4.5;
const FALLBACK_AVERAGE_PRICE: f64 = 50.0;
const FALLBACK_TOTAL_USERS: &str = "100+";

/// 總覽頁的統計卡片與列表
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub user_name: Option<String>,
    pub total_bikes: u64,
    pub average_rating: String,
    pub average_price: String,
    pub total_users: String,
    pub recent_bikes: Vec<Bike>,
    pub top_cheap_bikes: Vec<Bike>,
}

impl Overview {
    /// 統計缺欄位（或為 0）時使用列表長度與固定預設值
    pub fn build(
        user: Option<&User>,
        stats: &BikeStats,
        recent_bikes: Vec<Bike>,
        top_cheap_bikes: Vec<Bike>,
    ) -> Self {
        let total_bikes = stats
            .total_bikes
            .filter(|total| *total > 0)
            .unwrap_or(recent_bikes.len() as u64);
        let average_rating = stats
            .average_rating
            .unwrap_or(FALLBACK_AVERAGE_RATING);
        let average_price = stats
            .average_price
            .filter(|price| *price > 0.0)
            .unwrap_or(FALLBACK_AVERAGE_PRICE);
        let total_users = stats
            .total_users
            .filter(|total| *total > 0)
            .map(|total| total.to_string())
            .unwrap_or_else(|| FALLBACK_TOTAL_USERS.to_string());

        Self {
            user_name: user.map(|u| u.name.clone()),
            total_bikes,
            average_rating: format!("{:.1}", average_rating),
            average_price: format_currency(average_price, "USD"),
            total_users,
            recent_bikes,
            top_cheap_bikes,
        }
    }
}

/// 同時載入列表、最便宜前五名與統計
pub async fn load_overview(bikes: &BikeQueries, user: Option<&User>) -> Result<Overview> {
    let recent_query = BikeQuery {
        limit: Some(RECENT_BIKES_LIMIT),
        ..BikeQuery::default()
    };
    let (recent, top_cheap, stats) =
        tokio::try_join!(bikes.bikes(&recent_query), bikes.top_cheap(), bikes.stats())?;

    Ok(Overview::build(user, &stats, recent.bikes, top_cheap))
}
