//! 共用的 HTTP client
//!
//! 所有 service 都透過 [`ApiClient`] 呼叫後端。它負責：
//! - 把路徑接到 base URL 之後（每個 segment 都會 percent-encode）
//! - 以 cookie jar 保存 httpOnly session cookie
//! - 解析 `{status, data, message}` 外層結構
//! - 錯誤處理：401 丟掉本地 cookie 並導向 `/login`（不顯示 toast），其他錯誤顯示後端訊息

use crate::domain::model::{Envelope, ResponseStatus};
use crate::domain::ports::{Navigator, Notifier};
use crate::utils::error::{ClientError, Result, DEFAULT_ERROR_MESSAGE};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/v1";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("bike-rental-client/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: String,
    cookies: Option<String>,
    notifier: Option<Arc<dyn Notifier>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ApiClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// 以先前保存的 `Cookie` header 還原 session
    pub fn cookies(mut self, cookies: Option<String>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let mut base_url = Url::parse(&self.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidConfigValueError {
                field: "api.base_url".to_string(),
                value: self.base_url.clone(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }
        // 確保 join 時不會吃掉最後一段路徑
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let jar = Arc::new(Jar::default());
        if let Some(header) = self.cookies.as_deref() {
            restore_cookies(&jar, &base_url, header);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(headers)
            .user_agent(self.user_agent)
            .timeout(self.timeout)
            .build()?;

        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(crate::adapters::TracingNotifier::quiet()));
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(crate::adapters::MemoryNavigator::default()));

        Ok(ApiClient {
            base_url,
            client,
            jar,
            notifier,
            navigator,
            session_expired: Arc::new(AtomicBool::new(false)),
        })
    }
}

fn restore_cookies(jar: &Jar, base_url: &Url, header: &str) {
    for pair in header.split(';') {
        let pair = pair.trim();
        if !pair.is_empty() {
            jar.add_cookie_str(&format!("{}; Path=/", pair), base_url);
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    client: Client,
    jar: Arc<Jar>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    session_expired: Arc<AtomicBool>,
}

impl ApiClient {
    pub fn builder(base_url: &str) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookies: None,
            notifier: None,
            navigator: None,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    pub fn navigator(&self) -> Arc<dyn Navigator> {
        self.navigator.clone()
    }

    /// 組出 `base_url/segment/segment`
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ClientError::ConfigError {
                message: format!("{} cannot be used as a base URL", self.base_url),
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// 目前 session cookie 的 `Cookie` header 內容
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
            .filter(|value| !value.is_empty())
    }

    /// 上次讀取後是否收過 401；讀取後重設
    pub fn take_session_expired(&self) -> bool {
        self.session_expired.swap(false, Ordering::SeqCst)
    }

    /// 讓目前持有的 cookie 全部過期
    pub fn clear_cookies(&self) {
        if let Some(header) = self.cookie_header() {
            for pair in header.split(';') {
                if let Some((name, _)) = pair.trim().split_once('=') {
                    self.jar
                        .add_cookie_str(&format!("{}=; Max-Age=0; Path=/", name), &self.base_url);
                }
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Envelope<T>> {
        self.send::<T, (), ()>(Method::GET, segments, None, None).await
    }

    pub async fn get_with_query<T, Q>(&self, segments: &[&str], query: &Q) -> Result<Envelope<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send::<T, Q, ()>(Method::GET, segments, Some(query), None)
            .await
    }

    pub async fn post<T, B>(&self, segments: &[&str], body: &B) -> Result<Envelope<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send::<T, (), B>(Method::POST, segments, None, Some(body))
            .await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Envelope<T>> {
        self.send::<T, (), ()>(Method::POST, segments, None, None).await
    }

    pub async fn patch<T, B>(&self, segments: &[&str], body: &B) -> Result<Envelope<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send::<T, (), B>(Method::PATCH, segments, None, Some(body))
            .await
    }

    pub async fn patch_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Envelope<T>> {
        self.send::<T, (), ()>(Method::PATCH, segments, None, None).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Envelope<T>> {
        self.send::<T, (), ()>(Method::DELETE, segments, None, None).await
    }

    async fn send<T, Q, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<Envelope<T>>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments)?;
        tracing::debug!("➡️ {} {}", method, url);

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(&method, &url, e)),
        };

        let status = response.status();
        tracing::debug!("⬅️ {} {} -> {}", method, url, status);
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.transport_failure(&method, &url, e)),
        };

        if status.is_success() {
            return Self::parse_success(status, &bytes);
        }

        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(|body| body.message);
        Err(self.handle_failure(status, message))
    }

    fn parse_success<T: DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Result<Envelope<T>> {
        if status == StatusCode::NO_CONTENT || bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Envelope::empty());
        }

        let envelope: Envelope<T> = serde_json::from_slice(bytes)?;
        match envelope.status {
            ResponseStatus::Success => Ok(envelope),
            ResponseStatus::Fail | ResponseStatus::Error => Err(ClientError::FailError {
                message: envelope
                    .message
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            }),
        }
    }

    /// 連線、逾時或讀取回應失敗
    fn transport_failure(&self, method: &Method, url: &Url, e: reqwest::Error) -> ClientError {
        tracing::warn!("Request {} {} failed: {}", method, url, e);
        self.notifier.error(DEFAULT_ERROR_MESSAGE);
        ClientError::HttpError(e)
    }

    fn handle_failure(&self, status: StatusCode, message: Option<String>) -> ClientError {
        if status == StatusCode::UNAUTHORIZED {
            self.clear_cookies();
            self.session_expired.store(true, Ordering::SeqCst);
            if self.navigator.current_path() != LOGIN_PATH {
                tracing::info!("Session is not authenticated, redirecting to {}", LOGIN_PATH);
                self.navigator.navigate(LOGIN_PATH, false);
            }
            return ClientError::Unauthorized { message };
        }

        self.notifier
            .error(message.as_deref().unwrap_or(DEFAULT_ERROR_MESSAGE));
        ClientError::ApiError {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryNavigator, RecordingNotifier};
    use httpmock::prelude::*;

    fn client_for(
        server: &MockServer,
        notifier: Arc<RecordingNotifier>,
        navigator: Arc<MemoryNavigator>,
    ) -> ApiClient {
        ApiClient::builder(&server.url("/api/v1"))
            .notifier(notifier)
            .navigator(navigator)
            .build()
            .unwrap()
    }

    #[test]
    fn test_endpoint_joins_and_encodes_segments() {
        let api = ApiClient::builder("http://localhost:3000/api/v1").build().unwrap();
        assert_eq!(
            api.endpoint(&["bikes", "top-5-cheap"]).unwrap().as_str(),
            "http://localhost:3000/api/v1/bikes/top-5-cheap"
        );
        assert_eq!(
            api.endpoint(&["bikes", "a/b c"]).unwrap().as_str(),
            "http://localhost:3000/api/v1/bikes/a%2Fb%20c"
        );
    }

    #[test]
    fn test_restored_cookies_are_sent_back() {
        let api = ApiClient::builder("http://localhost:3000/api/v1")
            .cookies(Some("jwt=abc123".to_string()))
            .build()
            .unwrap();
        assert_eq!(api.cookie_header().as_deref(), Some("jwt=abc123"));

        api.clear_cookies();
        assert_eq!(api.cookie_header(), None);
    }

    #[tokio::test]
    async fn test_success_envelope_returns_data() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/bikes/bike-stats");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"status": "success", "data": {"totalBikes": 3}}));
        });

        let notifier = Arc::new(RecordingNotifier::new());
        let api = client_for(&server, notifier.clone(), Arc::new(MemoryNavigator::default()));
        let envelope: Envelope<serde_json::Value> =
            api.get(&["bikes", "bike-stats"]).await.unwrap();

        mock.assert();
        assert_eq!(envelope.into_data().unwrap()["totalBikes"], 3);
        assert!(notifier.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_redirects_without_toast() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/users/recommend");
            then.status(401)
                .json_body(serde_json::json!({"status": "fail", "message": "Please log in"}));
        });

        let notifier = Arc::new(RecordingNotifier::new());
        let navigator = Arc::new(MemoryNavigator::new("/bikes"));
        let api = client_for(&server, notifier.clone(), navigator.clone());

        let err = api
            .get::<serde_json::Value>(&["users", "recommend"])
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(navigator.current_path(), "/login");
        assert!(notifier.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_drops_stale_cookie() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/bikes");
            then.status(401)
                .json_body(serde_json::json!({"status": "fail", "message": "Your token has expired!"}));
        });

        let api = ApiClient::builder(&server.url("/api/v1"))
            .cookies(Some("jwt=old".to_string()))
            .build()
            .unwrap();
        assert!(!api.take_session_expired());

        let err = api.get::<serde_json::Value>(&["bikes"]).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(api.cookie_header(), None);
        assert!(api.take_session_expired());
        assert!(!api.take_session_expired());
    }

    #[tokio::test]
    async fn test_connection_refused_toasts_default_message() {
        // 綁定後立即釋放，取得一個沒有人監聽的 port
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let notifier = Arc::new(RecordingNotifier::new());
        let api = ApiClient::builder(&format!("http://127.0.0.1:{}/api/v1", port))
            .notifier(notifier.clone())
            .build()
            .unwrap();

        let err = api.get::<serde_json::Value>(&["bikes"]).await.unwrap_err();

        assert!(matches!(err, ClientError::HttpError(_)));
        assert!(err.is_retryable());
        assert_eq!(notifier.errors(), vec![DEFAULT_ERROR_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_truncated_body_toasts_default_message() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request);
            // 宣告 100 bytes 但只送出一部分就斷線
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"status\":",
            );
            let _ = stream.flush();
        });

        let notifier = Arc::new(RecordingNotifier::new());
        let api = ApiClient::builder(&format!("http://127.0.0.1:{}/api/v1", port))
            .notifier(notifier.clone())
            .build()
            .unwrap();

        let err = api
            .get::<serde_json::Value>(&["bikes", "bike-stats"])
            .await
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, ClientError::HttpError(_)));
        assert_eq!(notifier.errors(), vec![DEFAULT_ERROR_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_unauthorized_on_login_page_stays_put() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/users/login");
            then.status(401)
                .json_body(serde_json::json!({"status": "fail", "message": "Incorrect email or password"}));
        });

        let navigator = Arc::new(MemoryNavigator::new("/login"));
        let api = client_for(&server, Arc::new(RecordingNotifier::new()), navigator.clone());

        let err = api
            .post::<serde_json::Value, _>(&["users", "login"], &serde_json::json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.backend_message(), Some("Incorrect email or password"));
        assert_eq!(navigator.history(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn test_other_errors_toast_backend_message_or_default() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/bikes/b1");
            then.status(404)
                .json_body(serde_json::json!({"status": "fail", "message": "No bike found with that ID"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/bikes/recluster");
            then.status(500).body("upstream crashed");
        });

        let notifier = Arc::new(RecordingNotifier::new());
        let api = client_for(&server, notifier.clone(), Arc::new(MemoryNavigator::default()));

        let err = api.delete::<serde_json::Value>(&["bikes", "b1"]).await.unwrap_err();
        assert!(matches!(err, ClientError::ApiError { status: 404, .. }));

        let err = api
            .post_empty::<serde_json::Value>(&["bikes", "recluster"])
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        assert_eq!(
            notifier.errors(),
            vec![
                "No bike found with that ID".to_string(),
                DEFAULT_ERROR_MESSAGE.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_no_content_is_empty_success() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(DELETE).path("/api/v1/users/deleteMe");
            then.status(204);
        });

        let api = ApiClient::builder(&server.url("/api/v1")).build().unwrap();
        let envelope = api
            .delete::<serde_json::Value>(&["users", "deleteMe"])
            .await
            .unwrap();
        assert!(envelope.is_success());
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn test_fail_status_in_success_response_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PATCH).path("/api/v1/bookings/cancel/k1");
            then.status(200)
                .json_body(serde_json::json!({"status": "fail", "message": "Booking already cancelled"}));
        });

        let api = ApiClient::builder(&server.url("/api/v1")).build().unwrap();
        let err = api
            .patch_empty::<serde_json::Value>(&["bookings", "cancel", "k1"])
            .await
            .unwrap_err();
        assert_eq!(err.backend_message(), Some("Booking already cancelled"));
    }

    #[tokio::test]
    async fn test_session_cookie_is_captured_from_login() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/users/login");
            then.status(200)
                .header("Set-Cookie", "jwt=token-1; Path=/; HttpOnly")
                .json_body(serde_json::json!({"status": "success", "data": {}}));
        });
        let probe = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/users/recommend")
                .header("Cookie", "jwt=token-1");
            then.status(200)
                .json_body(serde_json::json!({"status": "success", "data": {}}));
        });

        let api = ApiClient::builder(&server.url("/api/v1")).build().unwrap();
        api.post::<serde_json::Value, _>(&["users", "login"], &serde_json::json!({}))
            .await
            .unwrap();
        api.get::<serde_json::Value>(&["users", "recommend"])
            .await
            .unwrap();

        probe.assert();
        assert_eq!(api.cookie_header().as_deref(), Some("jwt=token-1"));
    }
}
