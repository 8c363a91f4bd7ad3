//! Applicant validation engine.
//!
//! Each rule is a pure function returning `Ok(normalized)` or `Err(message)`.
//! [`validate_applicant`] composes them into the record-level check that gates
//! submission; [`validate_field`] runs a single rule for live blur/change
//! feedback. Malformed input is always a validation outcome, never a panic.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::models::{Applicant, RawApplicantForm, Suffix};

/// Form fields, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FirstName,
    MiddleInitial,
    LastName,
    Suffix,
    Address,
    Zip,
    City,
    State,
    HomePhone,
    MobilePhone,
    Email,
    ConsentGiven,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::FirstName,
        Field::MiddleInitial,
        Field::LastName,
        Field::Suffix,
        Field::Address,
        Field::Zip,
        Field::City,
        Field::State,
        Field::HomePhone,
        Field::MobilePhone,
        Field::Email,
        Field::ConsentGiven,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FirstName => "firstName",
            Field::MiddleInitial => "middleInitial",
            Field::LastName => "lastName",
            Field::Suffix => "suffix",
            Field::Address => "address",
            Field::Zip => "zip",
            Field::City => "city",
            Field::State => "state",
            Field::HomePhone => "homePhone",
            Field::MobilePhone => "mobilePhone",
            Field::Email => "email",
            Field::ConsentGiven => "consentGiven",
        }
    }

    pub fn is_required(&self) -> bool {
        !matches!(
            self,
            Field::MiddleInitial | Field::Suffix | Field::HomePhone
        )
    }
}

/// Field name → human-readable message. Ordered by form position.
pub type FieldErrors = BTreeMap<Field, String>;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // local@domain.tld, no whitespace
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
        )
        .expect("email pattern compiles")
    })
}

fn zip_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{5}(?:-\d{4})?$").expect("zip pattern compiles"))
}

/// Strips everything except ASCII digits.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Formats a phone as `NNN-NNN-NNNN` when it reduces to exactly 10 digits;
/// anything else is passed through untouched.
pub fn format_phone(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.len() == 10 {
        format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        raw.to_string()
    }
}

pub fn validate_required(value: &str, label: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{} is required", label))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn validate_middle_initial(value: &str) -> Result<Option<String>, String> {
    let trimmed = value.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Ok(None);
    }
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Ok(Some(c.to_uppercase().collect())),
        _ => Err("Middle initial must be a single letter".to_string()),
    }
}

pub fn validate_suffix(value: &str) -> Result<Option<Suffix>, String> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    Suffix::parse(value)
        .map(Some)
        .ok_or_else(|| "Select a valid suffix".to_string())
}

pub fn validate_zip(value: &str) -> Result<String, String> {
    let trimmed = validate_required(value, "Zip code")?;
    if zip_regex().is_match(&trimmed) {
        Ok(trimmed)
    } else {
        Err("Enter a 5-digit zip code (or ZIP+4)".to_string())
    }
}

pub fn validate_state(value: &str) -> Result<String, String> {
    let trimmed = validate_required(value, "State")?;
    if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err("Enter a two-letter state code".to_string())
    }
}

/// Phone rule shared by home and mobile phone.
///
/// Formatting punctuation is stripped first; exactly 10 digits must remain.
pub fn validate_phone(value: &str, required: bool, label: &str) -> Result<Option<String>, String> {
    if value.trim().is_empty() {
        return if required {
            Err(format!("{} is required", label))
        } else {
            Ok(None)
        };
    }
    let digits = digits_only(value);
    if digits.len() == 10 {
        Ok(Some(digits))
    } else {
        Err(format!("{} must be a 10-digit number", label))
    }
}

pub fn validate_email(value: &str) -> Result<String, String> {
    let trimmed = validate_required(value, "Email")?;
    if email_regex().is_match(&trimmed) {
        Ok(trimmed.to_lowercase())
    } else {
        Err("Enter a valid email address".to_string())
    }
}

pub fn validate_consent(given: bool) -> Result<bool, String> {
    if given {
        Ok(true)
    } else {
        Err("You must agree to the terms to continue".to_string())
    }
}

/// Runs the rule for one field. Used for live feedback on blur/change.
pub fn validate_field(field: Field, form: &RawApplicantForm) -> Option<String> {
    let result = match field {
        Field::FirstName => validate_required(&form.first_name, "First name").map(|_| ()),
        Field::MiddleInitial => validate_middle_initial(&form.middle_initial).map(|_| ()),
        Field::LastName => validate_required(&form.last_name, "Last name").map(|_| ()),
        Field::Suffix => validate_suffix(&form.suffix).map(|_| ()),
        Field::Address => validate_required(&form.address, "Address").map(|_| ()),
        Field::Zip => validate_zip(&form.zip).map(|_| ()),
        Field::City => validate_required(&form.city, "City").map(|_| ()),
        Field::State => validate_state(&form.state).map(|_| ()),
        Field::HomePhone => validate_phone(&form.home_phone, false, "Home phone").map(|_| ()),
        Field::MobilePhone => {
            validate_phone(&form.mobile_phone, true, "Mobile phone").map(|_| ())
        }
        Field::Email => validate_email(&form.email).map(|_| ()),
        Field::ConsentGiven => validate_consent(form.consent_given).map(|_| ()),
    };
    result.err()
}

/// Record-level validation. The authoritative pre-submission check.
pub fn validate_applicant(form: &RawApplicantForm) -> Result<Applicant, FieldErrors> {
    let mut errors = FieldErrors::new();

    fn check<T>(errors: &mut FieldErrors, field: Field, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                errors.insert(field, message);
                None
            }
        }
    }

    let first_name = check(
        &mut errors,
        Field::FirstName,
        validate_required(&form.first_name, "First name"),
    );
    let middle_initial = check(
        &mut errors,
        Field::MiddleInitial,
        validate_middle_initial(&form.middle_initial),
    );
    let last_name = check(
        &mut errors,
        Field::LastName,
        validate_required(&form.last_name, "Last name"),
    );
    let suffix = check(&mut errors, Field::Suffix, validate_suffix(&form.suffix));
    let address = check(
        &mut errors,
        Field::Address,
        validate_required(&form.address, "Address"),
    );
    let zip = check(&mut errors, Field::Zip, validate_zip(&form.zip));
    let city = check(&mut errors, Field::City, validate_required(&form.city, "City"));
    let state = check(&mut errors, Field::State, validate_state(&form.state));
    let home_phone = check(
        &mut errors,
        Field::HomePhone,
        validate_phone(&form.home_phone, false, "Home phone"),
    );
    let mobile_phone = check(
        &mut errors,
        Field::MobilePhone,
        validate_phone(&form.mobile_phone, true, "Mobile phone"),
    );
    let email = check(&mut errors, Field::Email, validate_email(&form.email));
    let consent_given = check(
        &mut errors,
        Field::ConsentGiven,
        validate_consent(form.consent_given),
    );

    match (
        first_name,
        middle_initial,
        last_name,
        suffix,
        address,
        zip,
        city,
        state,
        home_phone,
        mobile_phone,
        email,
        consent_given,
    ) {
        (
            Some(first_name),
            Some(middle_initial),
            Some(last_name),
            Some(suffix),
            Some(address),
            Some(zip),
            Some(city),
            Some(state),
            Some(home_phone),
            Some(Some(mobile_phone)),
            Some(email),
            Some(consent_given),
        ) if errors.is_empty() => Ok(Applicant {
            first_name,
            middle_initial,
            last_name,
            suffix,
            address,
            zip,
            city,
            state,
            home_phone,
            mobile_phone,
            email,
            consent_given,
        }),
        _ => {
            if errors.is_empty() {
                // mobile phone came back Ok(None), which the required rule forbids
                errors.insert(Field::MobilePhone, "Mobile phone is required".to_string());
            }
            tracing::debug!("Applicant validation failed on {} field(s)", errors.len());
            Err(errors)
        }
    }
}
