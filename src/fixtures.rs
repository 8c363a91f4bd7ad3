//! Shared values for unit tests.

use crate::models::{DealerContext, RawApplicantForm};

pub(crate) fn valid_form() -> RawApplicantForm {
    RawApplicantForm {
        first_name: "Jane".to_string(),
        middle_initial: "q".to_string(),
        last_name: "Doe".to_string(),
        suffix: String::new(),
        address: "100 Congress Ave".to_string(),
        zip: "78701".to_string(),
        city: "Austin".to_string(),
        state: "tx".to_string(),
        home_phone: String::new(),
        mobile_phone: "(512) 555-0100".to_string(),
        email: "Jane.Doe@Example.com".to_string(),
        consent_given: true,
    }
}

pub(crate) fn dealer() -> DealerContext {
    DealerContext {
        id: "dealer-42".to_string(),
        name: "Main Street Motors".to_string(),
        phone: "5125550199".to_string(),
        adf_email: "c@z.com".to_string(),
        additional_adf_emails: vec!["a@x.com".to_string(), "b@y.com".to_string()],
        contact_email: Some("sales@mainstreet.example".to_string()),
    }
}
