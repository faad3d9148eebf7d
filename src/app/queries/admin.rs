use crate::core::query::{QueryClient, QueryKey};
use crate::core::services::{AdminService, UserQuery};
use crate::domain::model::User;
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub fn users_root() -> QueryKey {
    QueryKey::new("users")
}

pub fn users_key(params: &UserQuery) -> QueryKey {
    users_root().with_params(params)
}

pub fn user_key(id: &str) -> QueryKey {
    QueryKey::new("user").push(id)
}

/// 使用者管理（管理員）的查詢與 mutation
#[derive(Clone)]
pub struct AdminQueries {
    service: AdminService,
    client: Arc<QueryClient>,
    stale_time: Duration,
}

impl AdminQueries {
    pub fn new(service: AdminService, client: Arc<QueryClient>) -> Self {
        Self {
            service,
            client,
            stale_time: Duration::from_secs(5 * 60),
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub async fn users(&self, params: &UserQuery) -> Result<Vec<User>> {
        let options = self.client.options().stale_time(self.stale_time);
        self.client
            .fetch_query(users_key(params), options, || {
                self.service.get_all_users(params)
            })
            .await
    }

    pub async fn user(&self, id: &str) -> Result<Option<User>> {
        let options = self
            .client
            .options()
            .stale_time(self.stale_time)
            .enabled(!id.trim().is_empty());
        self.client
            .query(user_key(id), options, || self.service.get_user(id))
            .await
    }

    pub async fn update_user<B: Serialize + ?Sized>(&self, id: &str, data: &B) -> Result<User> {
        self.client
            .mutate(
                self.service.update_user(id, data),
                &[users_root(), user_key(id)],
                "User updated successfully!",
                "Failed to update user",
            )
            .await
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.client
            .mutate(
                self.service.delete_user(id),
                &[users_root()],
                "User deleted successfully!",
                "Failed to delete user",
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingNotifier;
    use crate::core::api::ApiClient;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_delete_user_invalidates_user_lists() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/users");
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "data": {"users": [{"_id": "u2", "name": "Bo", "email": "bo@example.com"}]}
            }));
        });
        server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/users/u2");
            then.status(204);
        });

        let notifier = Arc::new(RecordingNotifier::new());
        let api = ApiClient::builder(&server.url("/api/v1"))
            .notifier(notifier.clone())
            .build()
            .unwrap();
        let client = Arc::new(QueryClient::new(notifier.clone()));
        let admin = AdminQueries::new(AdminService::new(api), client.clone());

        let params = UserQuery::default();
        assert_eq!(admin.users(&params).await.unwrap().len(), 1);
        admin.delete_user("u2").await.unwrap();

        assert_eq!(client.is_invalidated(&users_key(&params)), Some(true));
        assert_eq!(notifier.successes(), vec!["User deleted successfully!".to_string()]);
        assert_eq!(admin.user("  ").await.unwrap(), None);
    }
}
