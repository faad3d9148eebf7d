use crate::domain::model::User;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};

/// 兩次執行之間保存的登入狀態
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// `Cookie` header 形式的 session cookie，例如 `jwt=...`
    pub cookies: Option<String>,
    pub user: Option<User>,
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> impl std::future::Future<Output = Result<SessionSnapshot>> + Send;
    fn save(
        &self,
        snapshot: &SessionSnapshot,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn clear(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 使用者通知（toast）
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// 目前所在頁面與導向
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str, replace: bool);
}
