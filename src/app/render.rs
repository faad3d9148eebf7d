//! 命令列輸出：表格、JSON 或 CSV

use crate::domain::model::{Bike, Booking, Role, User};
use crate::utils::error::{ClientError, Result};
use crate::utils::helpers::{
    days_between, format_currency, format_date, generate_star_rating, truncate_text,
    DEFAULT_DATE_FORMAT,
};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(ClientError::InvalidConfigValueError {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: table, json, csv".to_string(),
            }),
        }
    }
}

/// 可以輸出成一列表格的資料
pub trait Tabular {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

impl Tabular for Bike {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "price", "engineCC", "weight", "rating", "summary"]
    }

    fn row(&self) -> Vec<String> {
        let price = match self.original_price() {
            Some(original) => format!(
                "{} (was {})",
                format_currency(self.price, "USD"),
                format_currency(original, "USD")
            ),
            None => format_currency(self.price, "USD"),
        };
        vec![
            self.id.clone(),
            self.name.clone(),
            price,
            self.engine_cc.to_string(),
            self.weight.to_string(),
            format!(
                "{} {:.1} ({})",
                generate_star_rating(self.ratings_average),
                self.ratings_average,
                self.ratings_quantity
            ),
            truncate_text(&self.summary, 50),
        ]
    }
}

impl Tabular for Booking {
    fn headers() -> &'static [&'static str] {
        &["id", "bike", "pickup", "drop", "start", "end", "days", "price", "status"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.bike_id().to_string(),
            self.pickup_location.clone(),
            self.drop_location.clone(),
            format_date(&self.start_date, DEFAULT_DATE_FORMAT),
            format_date(&self.end_date, DEFAULT_DATE_FORMAT),
            days_between(&self.start_date, &self.end_date)
                .map(|days| days.to_string())
                .unwrap_or_default(),
            self.price
                .map(|price| format_currency(price, "USD"))
                .unwrap_or_default(),
            self.status.clone().unwrap_or_default(),
        ]
    }
}

impl Tabular for User {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "email", "role"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            role_label(&self.role).to_string(),
        ]
    }
}

pub fn role_label(role: &Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Guide => "guide",
        Role::LeadGuide => "lead-guide",
        Role::Admin => "admin",
        Role::Other => "other",
    }
}

pub fn render_list<T: Tabular + Serialize>(items: &[T], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
        OutputFormat::Csv => {
            let rows: Vec<Vec<String>> = items.iter().map(Tabular::row).collect();
            write_csv(T::headers(), &rows)
        }
        OutputFormat::Table => {
            if items.is_empty() {
                return Ok("No results found.".to_string());
            }
            let rows: Vec<Vec<String>> = items.iter().map(Tabular::row).collect();
            Ok(write_table(T::headers(), &rows))
        }
    }
}

/// 單筆資料：JSON 原樣輸出，表格與 CSV 以「欄位 / 值」兩欄呈現
pub fn render_record<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    let json = serde_json::to_value(value)?;
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(&json)?);
    }

    let rows: Vec<Vec<String>> = match &json {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(key, value)| vec![key.clone(), scalar_text(value)])
            .collect(),
        other => vec![vec!["value".to_string(), scalar_text(other)]],
    };

    match format {
        OutputFormat::Csv => write_csv(&["field", "value"], &rows),
        _ => Ok(write_table(&["field", "value"], &rows)),
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => format!("{} item(s)", items.len()),
        other => other.to_string(),
    }
}

fn write_csv(headers: &[&str], rows: &[Vec<String>]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ClientError::IoError(std::io::Error::new(e.error().kind(), e.to_string())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let padding = width.saturating_sub(cell.chars().count());
                format!("{}{}", cell, " ".repeat(padding))
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(headers.to_vec())];
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(format_row(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}
