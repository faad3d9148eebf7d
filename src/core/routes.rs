//! 路由表與存取守衛
//!
//! 每個路徑對應一個頁面與一種守衛。守衛只看 [`AuthState`]：
//! - `Protected`：探測中顯示 "Authenticating..."，未登入導向 `/login`
//! - `AdminOnly`：同 `Protected`，另外要求管理員身份
//! - `Public`：只給未登入者，已登入導向 `/`

use crate::core::api::LOGIN_PATH;
use crate::core::session::AuthState;
use crate::domain::model::User;
use crate::utils::helpers::is_admin;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Public,
    Protected,
    AdminOnly,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Login,
    Signup,
    Overview,
    Bikes,
    BikeDetail { id: String },
    Bookings,
    Profile,
    /// `/admin/*`，`section` 為 `/admin/` 之後的路徑（可能為空）
    Admin { section: String },
    NotFound,
}

impl Page {
    pub fn title(&self) -> &'static str {
        match self {
            Page::Login => "Login",
            Page::Signup => "Sign Up",
            Page::Overview => "Overview",
            Page::Bikes => "Bikes",
            Page::BikeDetail { .. } => "Bike Details",
            Page::Bookings => "My Bookings",
            Page::Profile => "Profile",
            Page::Admin { .. } => "Admin Dashboard",
            Page::NotFound => "404 - Page Not Found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Loading { text: &'static str },
    Redirect { to: String, replace: bool },
    AccessDenied,
    Render(Page),
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDecision::Loading { text } => write!(f, "{}", text),
            RouteDecision::Redirect { to, .. } => write!(f, "Redirect to {}", to),
            RouteDecision::AccessDenied => {
                write!(f, "Access Denied: You don't have permission to access this page.")
            }
            RouteDecision::Render(page) => write!(f, "{}", page.title()),
        }
    }
}

type Params = BTreeMap<&'static str, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Static(&'static str),
    Param(&'static str),
    Rest,
}

struct Route {
    pattern: &'static str,
    segments: Vec<Segment>,
    guard: Guard,
    build: fn(&Params) -> Page,
}

impl Route {
    fn new(pattern: &'static str, guard: Guard, build: fn(&Params) -> Page) -> Self {
        let segments = split_path(pattern)
            .map(|segment| match segment {
                "*" => Segment::Rest,
                s if s.starts_with(':') => Segment::Param(&s[1..]),
                s => Segment::Static(s),
            })
            .collect();
        Self {
            pattern,
            segments,
            guard,
            build,
        }
    }

    fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = split_path(path).collect();
        let mut params = Params::new();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Rest => {
                    params.insert("*", parts.get(index..).unwrap_or_default().join("/"));
                    return Some(params);
                }
                Segment::Static(expected) => {
                    if parts.get(index) != Some(expected) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(*name, parts.get(index)?.to_string());
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|segment| !segment.is_empty())
}

pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// 應用程式的路由表，依宣告順序比對，最後一條為 404
    pub fn standard() -> Self {
        Self {
            routes: vec![
                Route::new("/login", Guard::Public, |_| Page::Login),
                Route::new("/signup", Guard::Public, |_| Page::Signup),
                Route::new("/", Guard::Protected, |_| Page::Overview),
                Route::new("/bikes", Guard::Protected, |_| Page::Bikes),
                Route::new("/bikes/:id", Guard::Protected, |params| Page::BikeDetail {
                    id: params.get("id").cloned().unwrap_or_default(),
                }),
                Route::new("/bookings", Guard::Protected, |_| Page::Bookings),
                Route::new("/profile", Guard::Protected, |_| Page::Profile),
                Route::new("/admin/*", Guard::AdminOnly, |params| Page::Admin {
                    section: params.get("*").cloned().unwrap_or_default(),
                }),
                Route::new("*", Guard::None, |_| Page::NotFound),
            ],
        }
    }

    pub fn guard_for(&self, path: &str) -> Guard {
        self.find(path)
            .map(|(route, _)| route.guard)
            .unwrap_or(Guard::None)
    }

    pub fn resolve(&self, path: &str, auth: &AuthState) -> RouteDecision {
        let Some((route, params)) = self.find(path) else {
            return RouteDecision::Render(Page::NotFound);
        };
        tracing::debug!("Route {} matched {} ({:?})", path, route.pattern, route.guard);

        match route.guard {
            Guard::None => RouteDecision::Render((route.build)(&params)),
            Guard::Public => {
                if auth.loading {
                    RouteDecision::Loading { text: "Loading..." }
                } else if auth.is_authenticated {
                    RouteDecision::Redirect {
                        to: HOME_PATH.to_string(),
                        replace: true,
                    }
                } else {
                    RouteDecision::Render((route.build)(&params))
                }
            }
            Guard::Protected | Guard::AdminOnly => {
                if auth.loading {
                    RouteDecision::Loading {
                        text: "Authenticating...",
                    }
                } else if !auth.is_authenticated {
                    RouteDecision::Redirect {
                        to: LOGIN_PATH.to_string(),
                        replace: true,
                    }
                } else if route.guard == Guard::AdminOnly && !is_admin(auth.user.as_ref()) {
                    RouteDecision::AccessDenied
                } else {
                    RouteDecision::Render((route.build)(&params))
                }
            }
        }
    }

    fn find(&self, path: &str) -> Option<(&Route, Params)> {
        self.routes
            .iter()
            .find_map(|route| route.matches(path).map(|params| (route, params)))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub path: &'static str,
    pub label: &'static str,
    pub active: bool,
}

const MAIN_LINKS: [(&str, &str); 3] = [
    ("/", "Overview"),
    ("/bikes", "Bikes"),
    ("/bookings", "My Bookings"),
];

const ADMIN_LINKS: [(&str, &str); 3] = [
    ("/admin", "Admin Dashboard"),
    ("/admin/bikes", "Manage Bikes"),
    ("/admin/users", "Manage Users"),
];

/// 頁首導覽連結；未登入時沒有連結，管理員多三個管理頁面
pub fn nav_links(user: Option<&User>, current_path: &str) -> Vec<NavLink> {
    if user.is_none() {
        return Vec::new();
    }
    let admin_links: &[(&str, &str)] = if is_admin(user) { &ADMIN_LINKS } else { &[] };
    MAIN_LINKS
        .iter()
        .chain(admin_links)
        .map(|&(path, label)| NavLink {
            path,
            label,
            active: path == current_path,
        })
        .collect()
}
