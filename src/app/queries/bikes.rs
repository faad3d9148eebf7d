use crate::core::query::{QueryClient, QueryKey, QueryOptions};
use crate::core::services::{BikeList, BikeQuery, BikesService};
use crate::domain::model::{Bike, BikeStats};
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub fn bikes_root() -> QueryKey {
    QueryKey::new("bikes")
}

pub fn bikes_key(params: &BikeQuery) -> QueryKey {
    bikes_root().with_params(params)
}

pub fn bike_key(id: &str) -> QueryKey {
    QueryKey::new("bike").push(id)
}

pub fn top_cheap_key() -> QueryKey {
    QueryKey::from_parts(&["bikes", "top-cheap"])
}

pub fn stats_key() -> QueryKey {
    QueryKey::from_parts(&["bikes", "stats"])
}

/// 單車相關的查詢與 mutation
#[derive(Clone)]
pub struct BikeQueries {
    service: BikesService,
    client: Arc<QueryClient>,
    list_stale: Duration,
    highlights_stale: Duration,
}

impl BikeQueries {
    pub fn new(service: BikesService, client: Arc<QueryClient>) -> Self {
        Self {
            service,
            client,
            list_stale: Duration::from_secs(5 * 60),
            highlights_stale: Duration::from_secs(10 * 60),
        }
    }

    pub fn with_stale_times(mut self, list: Duration, highlights: Duration) -> Self {
        self.list_stale = list;
        self.highlights_stale = highlights;
        self
    }

    fn options(&self, stale_time: Duration) -> QueryOptions {
        self.client.options().stale_time(stale_time)
    }

    pub async fn bikes(&self, params: &BikeQuery) -> Result<BikeList> {
        let params = params.clone().normalized();
        self.client
            .fetch_query(bikes_key(&params), self.options(self.list_stale), || {
                self.service.get_all_bikes(&params)
            })
            .await
    }

    /// 空 id 時不查詢
    pub async fn bike(&self, id: &str) -> Result<Option<Bike>> {
        let options = self.options(self.list_stale).enabled(!id.trim().is_empty());
        self.client
            .query(bike_key(id), options, || self.service.get_bike(id))
            .await
    }

    pub async fn top_cheap(&self) -> Result<Vec<Bike>> {
        self.client
            .fetch_query(top_cheap_key(), self.options(self.highlights_stale), || {
                self.service.get_top_cheap_bikes()
            })
            .await
    }

    pub async fn stats(&self) -> Result<BikeStats> {
        self.client
            .fetch_query(stats_key(), self.options(self.highlights_stale), || {
                self.service.get_bike_stats()
            })
            .await
    }

    pub async fn create_bike<B: Serialize + ?Sized>(&self, bike: &B) -> Result<Bike> {
        self.client
            .mutate(
                self.service.create_bike(bike),
                &[bikes_root()],
                "Bike created successfully!",
                "Failed to create bike",
            )
            .await
    }

    pub async fn update_bike<B: Serialize + ?Sized>(&self, id: &str, bike: &B) -> Result<Bike> {
        self.client
            .mutate(
                self.service.update_bike(id, bike),
                &[bikes_root(), bike_key(id)],
                "Bike updated successfully!",
                "Failed to update bike",
            )
            .await
    }

    pub async fn delete_bike(&self, id: &str) -> Result<()> {
        self.client
            .mutate(
                self.service.delete_bike(id),
                &[bikes_root()],
                "Bike deleted successfully!",
                "Failed to delete bike",
            )
            .await
    }

    pub async fn recluster(&self) -> Result<serde_json::Value> {
        self.client
            .mutate(
                self.service.recluster_bikes(),
                &[bikes_root()],
                "Bikes reclustered successfully!",
                "Failed to recluster bikes",
            )
            .await
    }
}
