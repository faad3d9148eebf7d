//! 組裝整個 client：設定 → API client → 登入狀態 → 查詢快取 → 路由
//!
//! [`RentalApp`] 在啟動時從 [`SessionStore`] 還原 cookie 與使用者，
//! 探測登入狀態，結束前以 [`RentalApp::persist`] 寫回。

pub mod overview;
pub mod queries;
pub mod render;

use crate::config::toml_config::ClientConfig;
use crate::core::api::ApiClient;
use crate::core::query::QueryClient;
use crate::core::routes::{RouteDecision, RouteTable};
use crate::core::services::{AdminService, AuthService, BikesService, BookingsService};
use crate::core::session::AuthSession;
use crate::domain::ports::{Navigator, Notifier, SessionSnapshot, SessionStore};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use queries::{AdminQueries, BikeQueries, BookingQueries};
use std::sync::Arc;

pub use overview::{load_overview, Overview};
pub use render::{render_list, render_record, OutputFormat, Tabular};

pub struct RentalApp<S: SessionStore> {
    store: S,
    api: ApiClient,
    session: AuthSession,
    queries: Arc<QueryClient>,
    routes: RouteTable,
    bikes: BikeQueries,
    bookings: BookingQueries,
    admin: AdminQueries,
}

impl<S: SessionStore> RentalApp<S> {
    /// 還原上次的 session 並探測是否仍然有效
    pub async fn start(
        config: &ClientConfig,
        store: S,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        config.validate()?;

        let snapshot = store.load().await?;
        tracing::debug!(
            "Restored session (cookie: {}, user: {})",
            snapshot.cookies.is_some(),
            snapshot.user.is_some()
        );

        let api = ApiClient::builder(&config.api.base_url)
            .timeout(config.timeout())
            .user_agent(&config.api.user_agent)
            .cookies(snapshot.cookies.clone())
            .notifier(notifier.clone())
            .navigator(navigator)
            .build()?;

        let queries = Arc::new(QueryClient::with_defaults(notifier, config.query_defaults()));
        let bikes = BikeQueries::new(BikesService::new(api.clone()), queries.clone())
            .with_stale_times(config.bikes_stale_time(), config.highlights_stale_time());
        let bookings = BookingQueries::new(BookingsService::new(api.clone()), queries.clone());
        let admin = AdminQueries::new(AdminService::new(api.clone()), queries.clone())
            .with_stale_time(config.bikes_stale_time());

        let session = AuthSession::new(AuthService::new(api.clone()));
        session.restore_user(snapshot.user);

        let app = Self {
            store,
            api,
            session,
            queries,
            routes: RouteTable::standard(),
            bikes,
            bookings,
            admin,
        };
        app.session.check_auth_status().await;
        Ok(app)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    pub fn auth(&self) -> &AuthService {
        self.session.auth()
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn bikes(&self) -> &BikeQueries {
        &self.bikes
    }

    pub fn bookings(&self) -> &BookingQueries {
        &self.bookings
    }

    pub fn admin(&self) -> &AdminQueries {
        &self.admin
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// 前往 `path` 並套用守衛；被導向時以 replace 更新瀏覽紀錄
    pub fn visit(&self, path: &str) -> RouteDecision {
        let navigator = self.api.navigator();
        navigator.navigate(path, false);

        let decision = self.routes.resolve(path, &self.session.state());
        if let RouteDecision::Redirect { to, replace } = &decision {
            navigator.navigate(to, *replace);
        }
        decision
    }

    pub async fn overview(&self) -> Result<Overview> {
        load_overview(&self.bikes, self.session.user().as_ref()).await
    }

    /// 保存目前的 cookie 與使用者；兩者都沒有時刪除 session 檔
    pub async fn persist(&self) -> Result<()> {
        let snapshot = SessionSnapshot {
            cookies: self.api.cookie_header(),
            user: self.session.user(),
        };

        if snapshot.cookies.is_none() && snapshot.user.is_none() {
            self.store.clear().await
        } else {
            self.store.save(&snapshot).await
        }
    }
}
