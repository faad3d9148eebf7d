use crate::core::api::ApiClient;
use crate::domain::model::{Bike, BikeData, BikeStats, BikesData};
use crate::utils::error::{ClientError, Result};
use crate::utils::validation::validate_non_empty_string;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BikeSort {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "price")]
    PriceAsc,
    #[serde(rename = "-price")]
    PriceDesc,
    #[serde(rename = "-ratingsAverage")]
    Rating,
    #[serde(rename = "engineCC")]
    EngineCc,
}

impl BikeSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            BikeSort::Name => "name",
            BikeSort::PriceAsc => "price",
            BikeSort::PriceDesc => "-price",
            BikeSort::Rating => "-ratingsAverage",
            BikeSort::EngineCc => "engineCC",
        }
    }
}

impl fmt::Display for BikeSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BikeSort {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(BikeSort::Name),
            "price" => Ok(BikeSort::PriceAsc),
            "-price" => Ok(BikeSort::PriceDesc),
            "-ratingsAverage" | "rating" => Ok(BikeSort::Rating),
            "engineCC" | "engine" => Ok(BikeSort::EngineCc),
            other => Err(ClientError::InvalidConfigValueError {
                field: "sort".to_string(),
                value: other.to_string(),
                reason: "Expected one of: name, price, -price, -ratingsAverage, engineCC"
                    .to_string(),
            }),
        }
    }
}

/// 單車列表的搜尋與篩選條件，空值不會送出
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<BikeSort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl BikeQuery {
    /// 去掉空白搜尋字串
    pub fn normalized(mut self) -> Self {
        self.search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BikeList {
    pub bikes: Vec<Bike>,
    /// 後端回報的總筆數，沒有時等於 `bikes.len()`
    pub results: u64,
}

#[derive(Clone)]
pub struct BikesService {
    api: ApiClient,
}

impl BikesService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get_all_bikes(&self, params: &BikeQuery) -> Result<BikeList> {
        let envelope = self
            .api
            .get_with_query::<BikesData, _>(&["bikes"], params)
            .await?;
        let results = envelope.results;
        let bikes = envelope.data.map(|data| data.bikes).unwrap_or_default();
        Ok(BikeList {
            results: results.unwrap_or(bikes.len() as u64),
            bikes,
        })
    }

    pub async fn get_bike(&self, id: &str) -> Result<Bike> {
        validate_non_empty_string("id", id)?;
        let envelope = self.api.get::<BikeData>(&["bikes", id]).await?;
        Ok(envelope.into_data()?.bike)
    }

    pub async fn get_top_cheap_bikes(&self) -> Result<Vec<Bike>> {
        let envelope = self.api.get::<BikesData>(&["bikes", "top-5-cheap"]).await?;
        Ok(envelope.data.map(|data| data.bikes).unwrap_or_default())
    }

    pub async fn get_bike_stats(&self) -> Result<BikeStats> {
        let envelope = self.api.get::<BikeStats>(&["bikes", "bike-stats"]).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn create_bike<B: Serialize + ?Sized>(&self, bike: &B) -> Result<Bike> {
        let envelope = self.api.post::<BikeData, _>(&["bikes"], bike).await?;
        Ok(envelope.into_data()?.bike)
    }

    pub async fn update_bike<B: Serialize + ?Sized>(&self, id: &str, bike: &B) -> Result<Bike> {
        validate_non_empty_string("id", id)?;
        let envelope = self.api.patch::<BikeData, _>(&["bikes", id], bike).await?;
        Ok(envelope.into_data()?.bike)
    }

    pub async fn delete_bike(&self, id: &str) -> Result<()> {
        validate_non_empty_string("id", id)?;
        self.api.delete::<serde_json::Value>(&["bikes", id]).await?;
        Ok(())
    }

    /// 重新分群（管理員），回傳後端的 data（可能為 null）
    pub async fn recluster_bikes(&self) -> Result<serde_json::Value> {
        let envelope = self
            .api
            .post_empty::<serde_json::Value>(&["bikes", "recluster"])
            .await?;
        Ok(envelope.data.unwrap_or(serde_json::Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn service(server: &MockServer) -> BikesService {
        BikesService::new(ApiClient::builder(&server.url("/api/v1")).build().unwrap())
    }

    fn bike_json(id: &str, price: f64) -> serde_json::Value {
        serde_json::json!({
            "_id": id,
            "name": format!("Bike {}", id),
            "engineCC": 350,
            "weight": 170,
            "price": price,
            "summary": "Commuter",
            "ratingsAverage": 4.2,
            "ratingsQuantity": 8
        })
    }

    #[tokio::test]
    async fn test_get_all_bikes_sends_only_set_filters() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/bikes")
                .query_param("search", "trail")
                .query_param("sort", "-price")
                .query_param_exists("minPrice");
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "results": 2,
                "data": {"bikes": [bike_json("b1", 40.0), bike_json("b2", 30.0)]}
            }));
        });

        let list = service(&server)
            .get_all_bikes(
                &BikeQuery {
                    search: Some("  trail ".to_string()),
                    sort: Some(BikeSort::PriceDesc),
                    min_price: Some(10.0),
                    ..BikeQuery::default()
                }
                .normalized(),
            )
            .await
            .unwrap();

        mock.assert();
        assert_eq!(list.results, 2);
        assert_eq!(list.bikes[1].id, "b2");
    }

    #[tokio::test]
    async fn test_top_cheap_and_stats() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/bikes/top-5-cheap");
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "data": {"bikes": [bike_json("b3", 15.0)]}
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/bikes/bike-stats");
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "data": {"totalBikes": 12, "averageRating": 4.4}
            }));
        });

        let bikes = service(&server);
        assert_eq!(bikes.get_top_cheap_bikes().await.unwrap()[0].price, 15.0);
        let stats = bikes.get_bike_stats().await.unwrap();
        assert_eq!(stats.total_bikes, Some(12));
        assert_eq!(stats.average_price, None);
    }

    #[tokio::test]
    async fn test_update_and_delete_use_bike_id_path() {
        let server = MockServer::start();
        let update = server.mock(|when, then| {
            when.method(PATCH)
                .path("/api/v1/bikes/b1")
                .json_body(serde_json::json!({"price": 45.0}));
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "data": {"bike": bike_json("b1", 45.0)}
            }));
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/bikes/b1");
            then.status(204);
        });

        let bikes = service(&server);
        let updated = bikes
            .update_bike("b1", &serde_json::json!({"price": 45.0}))
            .await
            .unwrap();
        bikes.delete_bike("b1").await.unwrap();

        update.assert();
        delete.assert();
        assert_eq!(updated.price, 45.0);
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected_before_request() {
        let server = MockServer::start();
        let err = service(&server).get_bike("  ").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("-price".parse::<BikeSort>().unwrap(), BikeSort::PriceDesc);
        assert_eq!("rating".parse::<BikeSort>().unwrap(), BikeSort::Rating);
        assert!("cheapest".parse::<BikeSort>().is_err());
    }
}
