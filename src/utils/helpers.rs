//! 顯示用的小工具：金額、日期、評分星等、租金計算等

use crate::domain::model::{Bike, Role, User};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_DATE_FORMAT: &str = "%b %d, %Y";
pub const DEFAULT_DATE_TIME_FORMAT: &str = "%b %d, %Y %H:%M";

/// 以 en-US 慣例格式化金額，例如 `$1,234.50`
pub fn format_currency(amount: f64, currency: &str) -> String {
    let code = currency.to_ascii_uppercase();
    let (symbol, decimals) = match code.as_str() {
        "USD" => ("$", 2),
        "EUR" => ("€", 2),
        "GBP" => ("£", 2),
        "JPY" => ("¥", 0),
        "INR" => ("₹", 2),
        _ => ("", 2),
    };

    let body = group_thousands(amount.abs(), decimals);
    let sign = if amount < 0.0 { "-" } else { "" };
    if symbol.is_empty() {
        format!("{}{}\u{a0}{}", sign, code, body)
    } else {
        format!("{}{}{}", sign, symbol, body)
    }
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}.{}", grouped, frac),
        None => grouped,
    }
}

/// 可以被解讀成日期的值（ISO 字串或 chrono 型別）
pub trait AsDate {
    fn as_date(&self) -> Option<DateTime<Utc>>;
}

impl AsDate for DateTime<Utc> {
    fn as_date(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl AsDate for NaiveDate {
    fn as_date(&self) -> Option<DateTime<Utc>> {
        self.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
    }
}

impl AsDate for str {
    fn as_date(&self) -> Option<DateTime<Utc>> {
        let trimmed = self.trim();
        if trimmed.is_empty() {
            return None;
        }
        DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.as_date())
            })
    }
}

impl AsDate for String {
    fn as_date(&self) -> Option<DateTime<Utc>> {
        self.as_str().as_date()
    }
}

impl<T: AsDate + ?Sized> AsDate for &T {
    fn as_date(&self) -> Option<DateTime<Utc>> {
        (**self).as_date()
    }
}

impl<T: AsDate> AsDate for Option<T> {
    fn as_date(&self) -> Option<DateTime<Utc>> {
        self.as_ref().and_then(AsDate::as_date)
    }
}

/// 空值或無法解析的日期回傳空字串
pub fn format_date<D: AsDate + ?Sized>(date: &D, format: &str) -> String {
    date.as_date()
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_default()
}

pub fn format_date_time<D: AsDate + ?Sized>(date: &D) -> String {
    format_date(date, DEFAULT_DATE_TIME_FORMAT)
}

/// 完整天數差，往零取整
pub fn days_between<A: AsDate + ?Sized, B: AsDate + ?Sized>(start: &A, end: &B) -> Option<i64> {
    let start = start.as_date()?;
    let end = end.as_date()?;
    Some((end - start).num_days())
}

/// 租金 = 日租 × 天數（至少一天）− 折扣
pub fn calculate_rental_total<A: AsDate + ?Sized, B: AsDate + ?Sized>(
    daily_price: f64,
    start: &A,
    end: &B,
    discount: f64,
) -> f64 {
    let days = days_between(start, end).unwrap_or(0).max(1);
    daily_price * days as f64 - discount
}

pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let head: String = text.chars().take(max_length).collect();
    format!("{}...", head)
}

pub fn generate_star_rating(rating: f64) -> String {
    let full_stars = rating.max(0.0).floor() as usize;
    let has_half_star = rating.fract() != 0.0;

    let mut stars: Vec<char> = std::iter::repeat('★').take(full_stars).collect();
    if has_half_star {
        stars.push('☆');
    }
    while stars.len() < 5 {
        stars.push('☆');
    }
    stars.into_iter().collect()
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_whitespace() || ch == '-' {
            if !last_dash {
                slug.push('-');
                last_dash = true;
            }
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            slug.push(ch);
            last_dash = false;
        }
    }
    slug.trim_matches('-').to_string()
}

pub fn is_admin(user: Option<&User>) -> bool {
    matches!(user, Some(u) if u.role == Role::Admin)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Booked,
}

/// 目前沒有可用的預約資訊，所有單車一律視為可租
pub fn get_bike_availability_status(_bike: &Bike) -> Availability {
    Availability::Available
}

pub fn calculate_discount_percentage(original_price: f64, discounted_price: f64) -> i64 {
    if original_price == 0.0 || discounted_price == 0.0 {
        return 0;
    }
    (((original_price - discounted_price) / original_price) * 100.0).round() as i64
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let k = 1024f64;
    let value = bytes as f64;
    let i = ((value.ln() / k.ln()).floor() as usize).min(UNITS.len() - 1);
    let scaled = format!("{:.2}", value / k.powi(i as i32));
    let trimmed = scaled.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[i])
}

pub fn is_valid_image_file(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/jpeg" | "image/jpg" | "image/png" | "image/gif"
    )
}

/// 延遲執行：在 `wait` 內重複呼叫只會執行最後一次
pub struct Debouncer {
    wait: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            pending: Mutex::new(None),
        }
    }

    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let wait = self.wait;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            f();
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.replace(handle) {
                previous.abort();
            }
        }
    }

    pub fn cancel(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.take() {
                previous.abort();
            }
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
