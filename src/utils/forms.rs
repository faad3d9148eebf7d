//! 表單驗證 schema
//!
//! 每個表單同時也是送往後端的 payload（camelCase JSON）。`Validate`
//! 會收集所有失敗欄位，每個欄位只保留第一個錯誤訊息。

use crate::domain::model::{Preferences, Range};
use crate::utils::error::{ClientError, Result};
use crate::utils::validation::Validate;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

const MIN_PASSWORD_LEN: usize = 8;
const MIN_NAME_LEN: usize = 2;
const MAX_BIKE_NAME_LEN: usize = 40;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只記錄該欄位的第一個錯誤
    pub fn add(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ClientError::ValidationError(self))
        }
    }

    fn required(&mut self, field: &str, value: &str, message: &str) -> bool {
        if value.trim().is_empty() {
            self.add(field, message);
            return false;
        }
        true
    }

    fn email(&mut self, field: &str, value: &str) {
        if self.required(field, value, "Email is required") && !EMAIL_RE.is_match(value.trim()) {
            self.add(field, "Invalid email format");
        }
    }

    fn min_len(&mut self, field: &str, value: &str, min: usize, message: &str) {
        if value.chars().count() < min {
            self.add(field, message);
        }
    }

    fn password(&mut self, field: &str, value: &str, required_message: &str) {
        if self.required(field, value, required_message) {
            self.min_len(
                field,
                value,
                MIN_PASSWORD_LEN,
                "Password must be at least 8 characters",
            );
        }
    }

    fn password_confirm(&mut self, field: &str, password: &str, confirm: &str) {
        if self.required(field, confirm, "Password confirmation is required") && confirm != password
        {
            self.add(field, "Passwords must match");
        }
    }

    fn name(&mut self, field: &str, value: &str) {
        if self.required(field, value, "Name is required") {
            self.min_len(field, value, MIN_NAME_LEN, "Name must be at least 2 characters");
        }
    }

    fn positive_required(
        &mut self,
        field: &str,
        value: Option<f64>,
        required_message: &str,
        positive_message: &str,
    ) {
        match value {
            None => self.add(field, required_message),
            Some(v) if v <= 0.0 => self.add(field, positive_message),
            Some(_) => {}
        }
    }

    fn range(&mut self, prefix: &str, label: &str, range: &Range) {
        if let Some(min) = range.min {
            if min < 0.0 {
                self.add(
                    &format!("{}.min", prefix),
                    &format!("Minimum {} cannot be negative", label),
                );
            }
        }
        if let Some(max) = range.max {
            if max <= 0.0 {
                self.add(
                    &format!("{}.max", prefix),
                    &format!("Maximum {} must be positive", label),
                );
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// 表單 schema：回傳所有欄位錯誤
pub trait FormSchema {
    fn errors(&self) -> ValidationErrors;
}

macro_rules! validate_with_schema {
    ($($form:ty),+ $(,)?) => {
        $(
            impl Validate for $form {
                fn validate(&self) -> Result<()> {
                    self.errors().into_result()
                }
            }
        )+
    };
}

validate_with_schema!(
    LoginForm,
    SignupForm,
    ForgotPasswordForm,
    ResetPasswordForm,
    UpdatePasswordForm,
    ProfileForm,
    BikeForm,
    BookingForm,
    Preferences,
);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl FormSchema for LoginForm {
    fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.email("email", &self.email);
        errors.password("password", &self.password, "Password is required");
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl FormSchema for SignupForm {
    fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.name("name", &self.name);
        errors.email("email", &self.email);
        errors.password("password", &self.password, "Password is required");
        errors.password_confirm("passwordConfirm", &self.password, &self.password_confirm);
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl FormSchema for ForgotPasswordForm {
    fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.email("email", &self.email);
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

impl FormSchema for ResetPasswordForm {
    fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.password("password", &self.password, "Password is required");
        errors.password_confirm("passwordConfirm", &self.password, &self.password_confirm);
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordForm {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

impl FormSchema for UpdatePasswordForm {
    fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.required(
            "passwordCurrent",
            &self.password_current,
            "Current password is required",
        );
        errors.password("password", &self.password, "New password is required");
        errors.password_confirm("passwordConfirm", &self.password, &self.password_confirm);
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
}

impl FormSchema for ProfileForm {
    fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.name("name", &self.name);
        errors.email("email", &self.email);
        errors
    }
}

/// 管理員新增/修改單車用的表單
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeForm {
    pub name: String,
    #[serde(rename = "engineCC", skip_serializing_if = "Option::is_none")]
    pub engine_cc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_average: Option<f64>,
}

impl FormSchema for BikeForm {
    fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if errors.required("name", &self.name, "Bike name is required")
            && self.name.chars().count() > MAX_BIKE_NAME_LEN
        {
            errors.add("name", "Name must be at most 40 characters");
        }
        errors.positive_required(
            "engineCC",
            self.engine_cc,
            "Engine CC is required",
            "Engine CC must be positive",
        );
        errors.positive_required(
            "weight",
            self.weight,
            "Weight is required",
            "Weight must be positive",
        );
        errors.positive_required(
            "price",
            self.price,
            "Price is required",
            "Price must be positive",
        );
        if let Some(discount) = self.price_discount {
            if discount < 0.0 {
                errors.add("priceDiscount", "Discount cannot be negative");
            } else if discount > 0.0 && self.price.map_or(true, |price| discount >= price) {
                errors.add("priceDiscount", "Discount must be less than price");
            }
        }
        errors.required("summary", &self.summary, "Summary is required");
        errors.required("description", &self.description, "Description is required");
        if let Some(rating) = self.ratings_average {
            if rating < 1.0 {
                errors.add("ratingsAverage", "Rating must be at least 1");
            } else if rating > 5.0 {
                errors.add("ratingsAverage", "Rating must be at most 5");
            }
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    pub bike: String,
    pub pickup_location: String,
    pub drop_location: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl BookingForm {
    /// 以指定時間作為「現在」驗證，開始日期不可早於 `now`
    pub fn errors_at(&self, now: DateTime<Utc>) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.required("bike", &self.bike, "Please select a bike");
        errors.required(
            "pickupLocation",
            &self.pickup_location,
            "Pickup location is required",
        );
        errors.required(
            "dropLocation",
            &self.drop_location,
            "Drop location is required",
        );
        match self.start_date {
            None => errors.add("startDate", "Start date is required"),
            Some(start) if start < now => errors.add("startDate", "Start date cannot be in the past"),
            Some(_) => {}
        }
        match (self.start_date, self.end_date) {
            (_, None) => errors.add("endDate", "End date is required"),
            (Some(start), Some(end)) if end < start => {
                errors.add("endDate", "End date must be after start date")
            }
            _ => {}
        }
        errors
    }
}

impl FormSchema for BookingForm {
    fn errors(&self) -> ValidationErrors {
        self.errors_at(Utc::now())
    }
}

impl FormSchema for Preferences {
    fn errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.range("price", "price", &self.price);
        errors.range("engineCC", "engine CC", &self.engine_cc);
        errors.range("weight", "weight", &self.weight);
        errors
    }
}
