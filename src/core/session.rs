//! 登入狀態管理
//!
//! [`AuthSession`] 保存目前使用者與是否已登入，所有登入、註冊、登出、
//! 更新個人資料的動作都經過這裡，成功時顯示 toast。

use crate::core::services::AuthService;
use crate::domain::model::User;
use crate::domain::ports::Notifier;
use crate::utils::error::ClientError;
use crate::utils::forms::{LoginForm, ProfileForm, SignupForm};
use crate::utils::validation::Validate;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    /// 第一次探測完成前為 true
    pub loading: bool,
    pub is_authenticated: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            is_authenticated: false,
        }
    }
}

impl AuthState {
    /// 已完成探測的狀態，供路由判斷使用
    pub fn settled(user: Option<User>, is_authenticated: bool) -> Self {
        Self {
            user,
            loading: false,
            is_authenticated,
        }
    }
}

/// 表單動作的結果，失敗時附上要顯示在表單上的訊息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            success: false,
            error: Some(message),
        }
    }

    fn from_error(err: &ClientError, fallback: &str) -> Self {
        match err {
            ClientError::ValidationError(errors) => Self::failed(errors.to_string()),
            other => Self::failed(other.message_or(fallback)),
        }
    }
}

pub struct AuthSession {
    auth: AuthService,
    notifier: Arc<dyn Notifier>,
    state: RwLock<AuthState>,
}

impl AuthSession {
    pub fn new(auth: AuthService) -> Self {
        let notifier = auth.api().notifier();
        Self {
            auth,
            notifier,
            state: RwLock::new(AuthState::default()),
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn state(&self) -> AuthState {
        self.expire_if_unauthorized();
        self.state
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn user(&self) -> Option<User> {
        self.state().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    /// 還原上次保存的使用者；是否仍有效由 `check_auth_status` 決定
    pub fn restore_user(&self, user: Option<User>) {
        self.update(|state| state.user = user);
    }

    pub async fn check_auth_status(&self) -> AuthState {
        let check = self.auth.check_auth().await;
        // 探測本身的 401 已反映在結果中
        self.auth.api().take_session_expired();
        self.update(|state| {
            state.is_authenticated = check.is_authenticated;
            if !check.is_authenticated {
                state.user = None;
            }
            state.loading = false;
        });
        tracing::debug!("Auth status: authenticated={}", check.is_authenticated);
        self.state()
    }

    pub async fn login(&self, credentials: &LoginForm) -> ActionOutcome {
        let result = match credentials.validate() {
            Ok(()) => self.auth.login(credentials).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(user) => {
                tracing::info!("🔐 Logged in as {}", user.email);
                self.sign_in(user);
                self.notifier.success("Logged in successfully!");
                ActionOutcome::ok()
            }
            Err(e) => ActionOutcome::from_error(&e, "Login failed"),
        }
    }

    pub async fn signup(&self, form: &SignupForm) -> ActionOutcome {
        let result = match form.validate() {
            Ok(()) => self.auth.signup(form).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(user) => {
                tracing::info!("🆕 Account created for {}", user.email);
                self.sign_in(user);
                self.notifier.success("Account created successfully!");
                ActionOutcome::ok()
            }
            Err(e) => ActionOutcome::from_error(&e, "Signup failed"),
        }
    }

    pub async fn logout(&self) -> ActionOutcome {
        match self.auth.logout().await {
            Ok(()) => {
                self.update(|state| {
                    state.user = None;
                    state.is_authenticated = false;
                });
                self.notifier.success("Logged out successfully!");
                ActionOutcome::ok()
            }
            Err(e) => {
                tracing::warn!("Logout failed: {}", e);
                self.notifier.error("Error logging out");
                ActionOutcome::failed("Error logging out".to_string())
            }
        }
    }

    pub async fn update_profile(&self, profile: &ProfileForm) -> ActionOutcome {
        let result = match profile.validate() {
            Ok(()) => self.auth.update_profile(profile).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(user) => {
                self.update(|state| state.user = Some(user));
                self.notifier.success("Profile updated successfully!");
                ActionOutcome::ok()
            }
            Err(e) => ActionOutcome::from_error(&e, "Update failed"),
        }
    }

    /// 其他動作（例如偏好設定）回傳了新的使用者資料時同步更新
    pub fn replace_user(&self, user: User) {
        self.update(|state| state.user = Some(user));
    }

    /// API 收到 401 後，本地狀態回到未登入
    fn expire_if_unauthorized(&self) {
        if self.auth.api().take_session_expired() {
            tracing::info!("🔒 Session expired, signing out locally");
            self.update(|state| {
                state.user = None;
                state.is_authenticated = false;
            });
        }
    }

    fn sign_in(&self, user: User) {
        self.auth.api().take_session_expired();
        self.update(|state| {
            state.user = Some(user);
            state.is_authenticated = true;
            state.loading = false;
        });
    }

    fn update<F: FnOnce(&mut AuthState)>(&self, f: F) {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
