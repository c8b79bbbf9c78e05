//! Field validation for inbound form submissions.
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::NewRecord;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

// E.164: '+' then up to 15 digits, no leading zero.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid phone regex"));

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(r"^https?://[^\s/$.?#].[^\s]*$")
        .case_insensitive(true)
        .build()
        .expect("valid url regex")
});

const MAX_AGE_YEARS: i32 = 150;

/// Body of `POST /api/records/`. Every field is optional at the JSON level so
/// that missing fields are reported alongside the other field errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub link: Option<String>,
    pub dob: Option<String>,
}

/// Field name -> messages, for every field that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
#[error("validation failed for {} field(s)", .0.len())]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    fn add(&mut self, field: &'static str, msg: impl Into<String>) {
        self.0.entry(field).or_default().push(msg.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }
}

/// Normalize and validate a submission. `today` bounds the date of birth.
pub fn validate(req: &RecordRequest, today: NaiveDate) -> Result<NewRecord, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = required(&mut errors, "name", req.name.as_deref()).map(str::to_string);
    if let Some(name) = &name {
        let len = name.chars().count();
        if len < 2 {
            errors.add("name", "Name must be at least 2 characters long.");
        } else if len > 255 {
            errors.add("name", "Name cannot exceed 255 characters.");
        }
    }

    let email = required(&mut errors, "email", req.email.as_deref()).map(str::to_lowercase);
    if let Some(email) = &email {
        if !EMAIL_RE.is_match(email) {
            errors.add("email", "Invalid email format.");
        }
    }

    let phone_number =
        required(&mut errors, "phone_number", req.phone_number.as_deref()).map(str::to_string);
    if let Some(phone) = &phone_number {
        if !PHONE_RE.is_match(phone) {
            errors.add(
                "phone_number",
                "Phone number must be in international format (e.g., +919876543210).",
            );
        }
    }

    let link = optional(req.link.as_deref()).map(str::to_string);
    if let Some(link) = &link {
        if !URL_RE.is_match(link) {
            errors.add(
                "link",
                "Invalid URL format. Must start with http:// or https://",
            );
        }
    }

    let dob = optional(req.dob.as_deref()).and_then(|raw| {
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                errors.add("dob", "Date has wrong format. Use YYYY-MM-DD.");
                None
            }
        }
    });
    if let Some(dob) = dob {
        let oldest = NaiveDate::from_ymd_opt(today.year() - MAX_AGE_YEARS, 1, 1);
        if dob > today {
            errors.add("dob", "Date of birth cannot be in the future.");
        } else if oldest.map_or(false, |min| dob < min) {
            errors.add("dob", "Invalid date of birth.");
        }
    }

    match (name, email, phone_number) {
        (Some(name), Some(email), Some(phone_number)) if errors.is_empty() => Ok(NewRecord {
            name,
            email,
            phone_number,
            link,
            dob,
        }),
        _ => Err(errors),
    }
}

fn required<'a>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    match value.map(str::trim) {
        None => {
            errors.add(field, "This field is required.");
            None
        }
        Some("") => {
            errors.add(field, "This field may not be blank.");
            None
        }
        Some(v) => Some(v),
    }
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
