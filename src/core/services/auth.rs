use crate::core::api::{ApiClient, LOGIN_PATH};
use crate::domain::model::{Bike, Preferences, User, UserData};
use crate::domain::ports::Navigator;
use crate::utils::error::Result;
use crate::utils::forms::{
    LoginForm, ProfileForm, ResetPasswordForm, SignupForm, UpdatePasswordForm,
};
use crate::utils::validation::validate_non_empty_string;
use serde::Deserialize;

/// 部分端點（改密碼、偏好設定）不一定回傳使用者
#[derive(Debug, Default, Deserialize)]
struct MaybeUser {
    #[serde(default)]
    user: Option<User>,
}

#[derive(Debug, Default, Deserialize)]
struct Recommendations {
    #[serde(default, alias = "recommendations")]
    bikes: Vec<Bike>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthCheck {
    pub is_authenticated: bool,
}

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<User> {
        let envelope = self
            .api
            .post::<UserData, _>(&["users", "signup"], form)
            .await?;
        Ok(envelope.into_data()?.user)
    }

    pub async fn login(&self, credentials: &LoginForm) -> Result<User> {
        let envelope = self
            .api
            .post::<UserData, _>(&["users", "login"], credentials)
            .await?;
        Ok(envelope.into_data()?.user)
    }

    /// httpOnly cookie 無法由前端清除，只能丟掉本地持有的 cookie 並回到登入頁
    pub async fn logout(&self) -> Result<()> {
        self.api.clear_cookies();
        self.api.navigator().navigate(LOGIN_PATH, false);
        Ok(())
    }

    /// 回傳後端訊息，例如 "Token sent to email!"
    pub async fn forgot_password(&self, email: &str) -> Result<Option<String>> {
        let envelope = self
            .api
            .post::<serde_json::Value, _>(
                &["users", "forgotPassword"],
                &serde_json::json!({ "email": email }),
            )
            .await?;
        Ok(envelope.message)
    }

    pub async fn reset_password(
        &self,
        token: &str,
        passwords: &ResetPasswordForm,
    ) -> Result<Option<User>> {
        validate_non_empty_string("token", token)?;
        let envelope = self
            .api
            .patch::<MaybeUser, _>(&["users", "resetPassword", token], passwords)
            .await?;
        Ok(envelope.data.and_then(|data| data.user))
    }

    pub async fn update_password(&self, passwords: &UpdatePasswordForm) -> Result<Option<User>> {
        let envelope = self
            .api
            .patch::<MaybeUser, _>(&["users", "updateMyPassword"], passwords)
            .await?;
        Ok(envelope.data.and_then(|data| data.user))
    }

    pub async fn update_profile(&self, profile: &ProfileForm) -> Result<User> {
        let envelope = self
            .api
            .patch::<UserData, _>(&["users", "updateMe"], profile)
            .await?;
        Ok(envelope.into_data()?.user)
    }

    pub async fn delete_account(&self) -> Result<()> {
        self.api
            .delete::<serde_json::Value>(&["users", "deleteMe"])
            .await?;
        Ok(())
    }

    pub async fn set_preferences(&self, preferences: &Preferences) -> Result<Option<User>> {
        let envelope = self
            .api
            .patch::<MaybeUser, _>(&["users", "preferences"], preferences)
            .await?;
        Ok(envelope.data.and_then(|data| data.user))
    }

    pub async fn get_recommendations(&self) -> Result<Vec<Bike>> {
        let envelope = self
            .api
            .get::<Recommendations>(&["users", "recommend"])
            .await?;
        Ok(envelope.data.map(|data| data.bikes).unwrap_or_default())
    }

    /// 以受保護的端點探測登入狀態；任何錯誤都視為未登入
    pub async fn check_auth(&self) -> AuthCheck {
        match self
            .api
            .get::<serde_json::Value>(&["users", "recommend"])
            .await
        {
            Ok(_) => AuthCheck {
                is_authenticated: true,
            },
            Err(e) => {
                tracing::debug!("Auth probe failed: {}", e);
                AuthCheck {
                    is_authenticated: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryNavigator, RecordingNotifier};
    use crate::domain::model::Range;
    use httpmock::prelude::*;
    use std::sync::Arc;

    fn service(server: &MockServer) -> (AuthService, Arc<MemoryNavigator>) {
        let navigator = Arc::new(MemoryNavigator::new("/"));
        let api = ApiClient::builder(&server.url("/api/v1"))
            .notifier(Arc::new(RecordingNotifier::new()))
            .navigator(navigator.clone())
            .build()
            .unwrap();
        (AuthService::new(api), navigator)
    }

    fn user_json() -> serde_json::Value {
        serde_json::json!({"_id": "u1", "name": "Ana", "email": "ana@example.com", "role": "user"})
    }

    #[tokio::test]
    async fn test_login_posts_credentials_and_returns_user() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/users/login")
                .json_body(serde_json::json!({"email": "ana@example.com", "password": "password123"}));
            then.status(200)
                .json_body(serde_json::json!({"status": "success", "data": {"user": user_json()}}));
        });

        let (auth, _) = service(&server);
        let user = auth
            .login(&LoginForm {
                email: "ana@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        mock.assert();
        assert_eq!(user.name, "Ana");
    }

    #[tokio::test]
    async fn test_check_auth_maps_errors_to_unauthenticated() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/users/recommend");
            then.status(401);
        });

        let (auth, navigator) = service(&server);
        assert!(!auth.check_auth().await.is_authenticated);
        assert_eq!(navigator.current_path(), "/login");
    }

    #[tokio::test]
    async fn test_preferences_patch_skips_empty_ranges() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PATCH)
                .path("/api/v1/users/preferences")
                .json_body(serde_json::json!({"price": {"min": 10.0, "max": 60.0}}));
            then.status(200)
                .json_body(serde_json::json!({"status": "success", "data": {"user": user_json()}}));
        });

        let (auth, _) = service(&server);
        let user = auth
            .set_preferences(&Preferences {
                price: Range {
                    min: Some(10.0),
                    max: Some(60.0),
                },
                ..Preferences::default()
            })
            .await
            .unwrap();

        mock.assert();
        assert!(user.is_some());
    }

    #[tokio::test]
    async fn test_logout_drops_cookie_and_navigates_to_login() {
        let server = MockServer::start();
        let navigator = Arc::new(MemoryNavigator::new("/profile"));
        let api = ApiClient::builder(&server.url("/api/v1"))
            .cookies(Some("jwt=abc".to_string()))
            .navigator(navigator.clone())
            .build()
            .unwrap();
        let auth = AuthService::new(api);

        auth.logout().await.unwrap();

        assert_eq!(auth.api().cookie_header(), None);
        assert_eq!(navigator.current_path(), "/login");
    }

    #[tokio::test]
    async fn test_recommendations_and_forgot_password() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/users/recommend");
            then.status(200).json_body(serde_json::json!({
                "status": "success",
                "data": {"bikes": [{"_id": "b1", "name": "City", "price": 20}]}
            }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/users/forgotPassword")
                .json_body(serde_json::json!({"email": "ana@example.com"}));
            then.status(200)
                .json_body(serde_json::json!({"status": "success", "message": "Token sent to email!"}));
        });

        let (auth, _) = service(&server);
        let bikes = auth.get_recommendations().await.unwrap();
        assert_eq!(bikes.len(), 1);

        let message = auth.forgot_password("ana@example.com").await.unwrap();
        assert_eq!(message.as_deref(), Some("Token sent to email!"));
    }
}
