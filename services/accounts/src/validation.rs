//! Input validation utilities
//!
//! Each validator takes the raw request value and either returns the
//! normalized value or the message to report against the field.
//! [`FieldErrors`] collects those messages so every field of a request is
//! checked before anything is rejected.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{collections::BTreeMap, sync::OnceLock};

use crate::models::Role;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const EMAIL_TAKEN: &str = "An account with this email already exists.";
pub const USERNAME_TAKEN: &str = "This username is already taken.";
pub const PASSWORD_CONFIRM_REQUIRED: &str = "You must confirm your password.";
pub const PASSWORD_MISMATCH: &str = "Passwords do not match.";
pub const PHONE_NUMBER_TAKEN: &str = "This phone number is already registered.";
pub const INVALID_PHONE_FORMAT: &str =
    "Invalid phone number format. Use only digits, spaces, dashes, parentheses, and plus signs.";
pub const NOT_A_STRING: &str = "Not a valid string.";

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_PHONE_DIGITS: usize = 10;
pub const MAX_PHONE_DIGITS: usize = 15;

/// Validation failures keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors made of a single message against a single field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Record the error of `result` against `field`, yielding the value on success
    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Read a raw JSON field as text
///
/// Absent and `null` read as `None`. Numbers are taken in their JSON form, so
/// `"phone_number": 1234567890` reads as `"1234567890"`.
pub fn text_field(value: Option<&Value>) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(_) => Err(NOT_A_STRING.to_string()),
    }
}

/// Read a raw JSON field as a nested object; absent and `null` read as `None`
pub fn object_field(value: Option<&Value>) -> Result<Option<&Map<String, Value>>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(fields)) => Ok(Some(fields)),
        Some(other) => Err(format!(
            "Invalid data. Expected a dictionary, but got {}.",
            json_type(other)
        )),
    }
}

fn required(value: Option<&str>) -> Result<&str, String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(REQUIRED.to_string()),
    }
}

/// Lowercase and trim an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate an email address, returning its normalized form
pub fn validate_email(email: Option<&str>) -> Result<String, String> {
    let email = normalize_email(required(email)?);

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            MAX_EMAIL_LENGTH
        ));
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(&email) {
        return Err(INVALID_EMAIL.to_string());
    }

    Ok(email)
}

/// Validate a username, returning it trimmed
pub fn validate_username(username: Option<&str>) -> Result<String, String> {
    let username = required(username)?.trim();

    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Err("Username must be at least 3 characters long.".to_string());
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(format!(
            "Username must be at most {} characters long.",
            MAX_USERNAME_LENGTH
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err("Username can only contain letters, numbers, and underscores.".to_string());
    }

    Ok(username.to_string())
}

/// Validate a new password
pub fn validate_password(password: Option<&str>) -> Result<String, String> {
    let password = match password {
        Some(password) if !password.is_empty() => password,
        _ => return Err(REQUIRED.to_string()),
    };

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Ensure this field has at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    Ok(password.to_string())
}

/// Check the confirmation against the submitted password
pub fn validate_password_confirm(
    password: Option<&str>,
    password_confirm: Option<&str>,
) -> Result<(), String> {
    let confirm = match password_confirm {
        Some(confirm) if !confirm.is_empty() => confirm,
        _ => return Err(PASSWORD_CONFIRM_REQUIRED.to_string()),
    };

    if password != Some(confirm) {
        return Err(PASSWORD_MISMATCH.to_string());
    }

    Ok(())
}

/// Validate a phone number, returning only its digits
pub fn normalize_phone_number(phone_number: Option<&str>) -> Result<String, String> {
    let phone_number = required(phone_number)?.trim();

    let allowed = |c: char| c.is_ascii_digit() || c.is_whitespace() || "-()+".contains(c);
    if !phone_number.chars().all(allowed) {
        return Err(INVALID_PHONE_FORMAT.to_string());
    }

    let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();

    if digits.len() < MIN_PHONE_DIGITS {
        return Err(format!(
            "Phone number must contain at least {} digits.",
            MIN_PHONE_DIGITS
        ));
    }

    if digits.len() > MAX_PHONE_DIGITS {
        return Err(format!(
            "Phone number must contain at most {} digits.",
            MAX_PHONE_DIGITS
        ));
    }

    Ok(digits)
}

/// Parse a role, defaulting to [`Role::Student`] when absent
pub fn parse_role(role: Option<&str>) -> Result<Role, String> {
    match role {
        None => Ok(Role::default()),
        Some(role) => role.parse().map_err(|_| {
            let choices: Vec<&str> = Role::ALL.iter().map(Role::as_str).collect();
            format!("Invalid role. Must be one of: {}", choices.join(", "))
        }),
    }
}

/// Parse an optional `YYYY-MM-DD` date of birth
pub fn parse_date_of_birth(date_of_birth: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match date_of_birth.map(str::trim) {
        None | Some("") => Ok(None),
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.".to_string()
            }),
    }
}
