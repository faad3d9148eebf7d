use bike_rental_client::adapters::{FileSessionStore, MemoryNavigator, RecordingNotifier};
use bike_rental_client::core::services::BikeQuery;
use bike_rental_client::domain::ports::Navigator;
use bike_rental_client::core::{Page, RouteDecision};
use bike_rental_client::utils::error::ClientError;
use bike_rental_client::utils::forms::{BookingForm, LoginForm};
use bike_rental_client::{ClientConfig, RentalApp};
use chrono::{Duration, Utc};
use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn config(server: &MockServer, temp_dir: &TempDir) -> ClientConfig {
    let session_file = temp_dir.path().join("session.json");
    ClientConfig::default().with_overrides(
        Some(server.url("/api/v1")),
        Some(session_file),
    )
}

fn rider() -> serde_json::Value {
    json!({"_id": "u1", "name": "Ana", "email": "ana@example.com", "role": "user"})
}

#[tokio::test]
async fn test_login_persists_session_for_next_run() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let config = config(&server, &temp_dir);

    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/users/recommend")
            .header_missing("Cookie");
        then.status(401)
            .json_body(json!({"status": "fail", "message": "You are not logged in!"}));
    });
    let probe = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/users/recommend")
            .header("Cookie", "jwt=token123");
        then.status(200)
            .json_body(json!({"status": "success", "data": {"bikes": []}}));
    });
    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/users/login")
            .json_body(json!({"email": "ana@example.com", "password": "password123"}));
        then.status(200)
            .header("Set-Cookie", "jwt=token123; Path=/; HttpOnly")
            .json_body(json!({"status": "success", "data": {"user": rider()}}));
    });

    // 第一次執行：沒有 session，受保護頁面導向登入
    let navigator = Arc::new(MemoryNavigator::default());
    let notifier = Arc::new(RecordingNotifier::new());
    let app = RentalApp::start(
        &config,
        FileSessionStore::new(config.session_file()),
        notifier.clone(),
        navigator.clone(),
    )
    .await
    .unwrap();

    assert!(!app.session().is_authenticated());
    assert!(!app.session().is_loading());
    assert_eq!(
        app.visit("/bikes"),
        RouteDecision::Redirect {
            to: "/login".to_string(),
            replace: true
        }
    );
    // 探測登入狀態的 401 不會跳出錯誤訊息
    assert!(notifier.errors().is_empty());

    let outcome = app
        .session()
        .login(&LoginForm {
            email: "ana@example.com".to_string(),
            password: "password123".to_string(),
        })
        .await;
    assert!(outcome.success);
    assert_eq!(notifier.successes(), vec!["Logged in successfully!".to_string()]);
    login.assert();

    app.persist().await.unwrap();
    assert!(config.session_file().exists());

    // 第二次執行：從檔案還原 cookie 與使用者
    let app = RentalApp::start(
        &config,
        FileSessionStore::new(config.session_file()),
        Arc::new(RecordingNotifier::new()),
        Arc::new(MemoryNavigator::default()),
    )
    .await
    .unwrap();

    probe.assert();
    assert!(app.session().is_authenticated());
    assert_eq!(app.session().user().map(|u| u.name), Some("Ana".to_string()));
    assert_eq!(app.visit("/bookings"), RouteDecision::Render(Page::Bookings));
    assert_eq!(app.visit("/admin"), RouteDecision::AccessDenied);
    assert_eq!(
        app.visit("/login"),
        RouteDecision::Redirect {
            to: "/".to_string(),
            replace: true
        }
    );

    // 登出後刪除 session 檔
    assert!(app.session().logout().await.success);
    app.persist().await.unwrap();
    assert!(!config.session_file().exists());
}

#[tokio::test]
async fn test_booking_flow_refreshes_my_bookings() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let config = config(&server, &temp_dir);
    std::fs::write(
        config.session_file(),
        serde_json::to_string(&json!({"cookies": "jwt=token123", "user": rider()})).unwrap(),
    )
    .unwrap();

    let start = Utc::now() + Duration::days(2);
    let end = start + Duration::days(3);
    let booking = json!({
        "_id": "k1",
        "bike": "b1",
        "pickupLocation": "Harbor",
        "dropLocation": "Airport",
        "startDate": start.to_rfc3339(),
        "endDate": end.to_rfc3339(),
        "price": 120
    });

    server.mock(|when, then| {
        when.method(GET).path("/api/v1/users/recommend");
        then.status(200)
            .json_body(json!({"status": "success", "data": {"bikes": []}}));
    });
    let mut profile = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/users/me")
            .header("Cookie", "jwt=token123");
        then.status(200)
            .json_body(json!({"status": "success", "data": {"user": rider(), "bookings": []}}));
    });
    let create = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/bookings")
            .header("Cookie", "jwt=token123");
        then.status(201)
            .json_body(json!({"status": "success", "data": {"booking": booking}}));
    });

    let notifier = Arc::new(RecordingNotifier::new());
    let app = RentalApp::start(
        &config,
        FileSessionStore::new(config.session_file()),
        notifier.clone(),
        Arc::new(MemoryNavigator::default()),
    )
    .await
    .unwrap();

    assert!(app.bookings().my_bookings().await.unwrap().bookings.is_empty());
    profile.assert_hits(1);

    let created = app
        .bookings()
        .create_booking(&BookingForm {
            bike: "b1".to_string(),
            pickup_location: "Harbor".to_string(),
            drop_location: "Airport".to_string(),
            start_date: Some(start),
            end_date: Some(end),
        })
        .await
        .unwrap();
    create.assert();
    assert_eq!(created.id, "k1");
    assert_eq!(created.bike_id(), "b1");
    assert_eq!(
        notifier.successes(),
        vec!["Booking created successfully!".to_string()]
    );

    // 新增預約後「我的預約」被標記為過期，下次讀取會重新請求
    profile.delete();
    let refreshed = server.mock(|when, then| {
        when.method(GET).path("/api/v1/users/me");
        then.status(200)
            .json_body(json!({"status": "success", "data": {"user": rider(), "bookings": [booking]}}));
    });
    let bookings = app.bookings().my_bookings().await.unwrap().bookings;
    refreshed.assert_hits(1);
    assert_eq!(bookings.len(), 1);
}

#[tokio::test]
async fn test_expired_session_mid_run_redirects_without_toast() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let config = config(&server, &temp_dir);

    server.mock(|when, then| {
        when.method(GET).path("/api/v1/users/recommend");
        then.status(200)
            .json_body(json!({"status": "success", "data": {"bikes": []}}));
    });
    let bikes = server.mock(|when, then| {
        when.method(GET).path("/api/v1/bikes");
        then.status(401)
            .json_body(json!({"status": "fail", "message": "Your token has expired!"}));
    });

    let navigator = Arc::new(MemoryNavigator::default());
    let notifier = Arc::new(RecordingNotifier::new());
    let app = RentalApp::start(
        &config,
        FileSessionStore::new(config.session_file()),
        notifier.clone(),
        navigator.clone(),
    )
    .await
    .unwrap();
    assert_eq!(app.visit("/bikes"), RouteDecision::Render(Page::Bikes));

    let err = app.bikes().bikes(&BikeQuery::default()).await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized { .. }));
    assert_eq!(err.exit_code(), 3);
    // 401 不重試
    bikes.assert_hits(1);
    assert_eq!(navigator.current_path(), "/login");
    assert!(notifier.errors().is_empty());
}
