use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::users::dto::UserRequest;

const MIN_NAME_LENGTH: usize = 3;
const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Password,
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Password => "Password",
        }
    }

    fn min_length(self) -> usize {
        match self {
            Field::Name => MIN_NAME_LENGTH,
            Field::Email => 0,
            Field::Password => MIN_PASSWORD_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    Required,
    TooShort,
    InvalidFormat,
}

/// A single field-level rule failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: Field,
    pub code: ViolationCode,
    pub message: String,
}

impl Violation {
    pub fn new(field: Field, code: ViolationCode) -> Self {
        let label = field.label();
        let message = match code {
            ViolationCode::Required => format!("{label} is required and cannot be empty or blank."),
            ViolationCode::TooShort => format!(
                "{label} must be at least {} characters long.",
                field.min_length()
            ),
            ViolationCode::InvalidFormat => format!("{label} is not valid."),
        };
        Self {
            field,
            code,
            message,
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[A-Za-z0-9_.-]+@([A-Za-z0-9_-]+\.)+[A-Za-z0-9_-]{2,4}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn check_length(field: Field, value: &str) -> Option<Violation> {
    if is_blank(value) {
        Some(Violation::new(field, ViolationCode::Required))
    } else if value.chars().count() < field.min_length() {
        Some(Violation::new(field, ViolationCode::TooShort))
    } else {
        None
    }
}

fn check_email(email: &str) -> Option<Violation> {
    if is_blank(email) {
        Some(Violation::new(Field::Email, ViolationCode::Required))
    } else if !is_valid_email(email) {
        Some(Violation::new(Field::Email, ViolationCode::InvalidFormat))
    } else {
        None
    }
}

/// Checks every field and returns all violations, ordered name, email, password.
pub fn validate(request: &UserRequest) -> Vec<Violation> {
    [
        check_length(Field::Name, &request.name),
        check_email(&request.email),
        check_length(Field::Password, &request.password),
    ]
    .into_iter()
    .flatten()
    .collect()
}
