use crate::core::api::ApiClient;
use crate::domain::model::{User, UserData, UsersData};
use crate::utils::error::Result;
use crate::utils::validation::validate_non_empty_string;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// 使用者管理（管理員）
#[derive(Clone)]
pub struct AdminService {
    api: ApiClient,
}

impl AdminService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn get_all_users(&self, params: &UserQuery) -> Result<Vec<User>> {
        let envelope = self
            .api
            .get_with_query::<UsersData, _>(&["users"], params)
            .await?;
        Ok(envelope.data.map(|data| data.users).unwrap_or_default())
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        validate_non_empty_string("id", id)?;
        let envelope = self.api.get::<UserData>(&["users", id]).await?;
        Ok(envelope.into_data()?.user)
    }

    pub async fn update_user<B: Serialize + ?Sized>(&self, id: &str, data: &B) -> Result<User> {
        validate_non_empty_string("id", id)?;
        let envelope = self.api.patch::<UserData, _>(&["users", id], data).await?;
        Ok(envelope.into_data()?.user)
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        validate_non_empty_string("id", id)?;
        self.api.delete::<serde_json::Value>(&["users", id]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_list_users_with_role_filter() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/users")
                .query_param("role", "admin");
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "results": 1,
                "data": {"users": [{"_id": "u9", "name": "Root", "email": "root@example.com", "role": "admin"}]}
            }));
        });

        let admin = AdminService::new(ApiClient::builder(&server.url("/api/v1")).build().unwrap());
        let users = admin
            .get_all_users(&UserQuery {
                role: Some("admin".to_string()),
                ..UserQuery::default()
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(users[0].id, "u9");
    }

    #[tokio::test]
    async fn test_update_user_role() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/api/v1/users/u2")
                .json_body(serde_json::json!({"role": "guide"}));
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "data": {"user": {"_id": "u2", "name": "Bo", "email": "bo@example.com", "role": "guide"}}
            }));
        });

        let admin = AdminService::new(ApiClient::builder(&server.url("/api/v1")).build().unwrap());
        let user = admin
            .update_user("u2", &serde_json::json!({"role": "guide"}))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(user.role, crate::domain::model::Role::Guide);
    }
}
