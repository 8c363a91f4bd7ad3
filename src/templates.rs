//! Template store and renderer.
//!
//! Substitution is a literal `{{TOKEN}}` find-and-replace. Values are inserted
//! as-is, with no HTML or XML escaping, so the output matches the existing
//! dealer CRM templates byte for byte.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::AppError;
use crate::models::SubmissionPayload;
use crate::validation::format_phone;

pub const CONTACT_TEMPLATE: &str = "contact";
pub const ADF_TEMPLATE: &str = "adf";

const BUILTIN_CONTACT: &str = include_str!("../templates/contact.html");
const BUILTIN_ADF: &str = include_str!("../templates/adf.xml");
const BUILTIN_PAGES: &[(&str, &str)] = &[
    ("privacy", include_str!("../templates/pages/privacy.html")),
    ("terms", include_str!("../templates/pages/terms.html")),
];

/// Placeholder name → value.
pub type TemplateVars = Vec<(&'static str, String)>;

/// Replaces every `{{NAME}}` for each variable. Unknown placeholders stay.
pub fn render(template: &str, vars: &[(&'static str, String)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{{{}}}}}", name), value)
    })
}

/// Variables available to the notification templates.
pub fn submission_vars(payload: &SubmissionPayload, requested_at: DateTime<Utc>) -> TemplateVars {
    vec![
        ("DEALER_NAME", payload.dealer_name.clone()),
        ("DEALER_PHONE", format_phone(&payload.dealer_phone)),
        ("FIRST_NAME", payload.first_name.clone()),
        ("MIDDLE_INITIAL", payload.middle_initial.clone()),
        ("LAST_NAME", payload.last_name.clone()),
        ("SUFFIX", payload.suffix.clone()),
        ("ADDRESS", payload.address.clone()),
        ("CITY", payload.city.clone()),
        ("STATE", payload.state.clone()),
        ("ZIP", payload.zip.clone()),
        ("HOME_PHONE", format_phone(&payload.home_phone)),
        ("MOBILE_PHONE", format_phone(&payload.mobile_phone)),
        ("EMAIL", payload.email.clone()),
        (
            "REQUEST_DATE",
            requested_at.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
        ),
    ]
}

/// Variables available to the static pages.
pub fn page_vars(name: &str, phone: &str, adf_email: &str, today: DateTime<Utc>) -> TemplateVars {
    vec![
        ("DEALER_NAME", name.to_string()),
        ("DEALER_PHONE", format_phone(phone)),
        ("ADF_EMAIL", adf_email.to_string()),
        ("DATE", today.format("%B %-d, %Y").to_string()),
    ]
}

fn is_valid_page_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    notifications: HashMap<String, String>,
    pages: HashMap<String, String>,
}

impl TemplateStore {
    /// The templates compiled into the binary.
    pub fn builtin() -> Self {
        let notifications = HashMap::from([
            (CONTACT_TEMPLATE.to_string(), BUILTIN_CONTACT.to_string()),
            (ADF_TEMPLATE.to_string(), BUILTIN_ADF.to_string()),
        ]);
        let pages = BUILTIN_PAGES
            .iter()
            .map(|(name, body)| (name.to_string(), body.to_string()))
            .collect();
        Self {
            notifications,
            pages,
        }
    }

    /// Built-ins overridden by whatever `dir` provides:
    /// `contact.html`, `adf.xml` and `pages/<name>.html`.
    pub fn load(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut store = Self::builtin();

        for (name, file) in [(CONTACT_TEMPLATE, "contact.html"), (ADF_TEMPLATE, "adf.xml")] {
            let path = dir.join(file);
            if path.is_file() {
                let body = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
                tracing::info!("Loaded {} template override from {}", name, path.display());
                store.notifications.insert(name.to_string(), body);
            }
        }

        let pages_dir = dir.join("pages");
        if pages_dir.is_dir() {
            for entry in std::fs::read_dir(&pages_dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("html") {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if !is_valid_page_name(name) {
                    tracing::warn!("Skipping page with unsupported name: {}", path.display());
                    continue;
                }
                let body = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
                store.pages.insert(name.to_string(), body);
            }
        }

        tracing::info!(
            "Template store ready: {} notification template(s), {} page(s)",
            store.notifications.len(),
            store.pages.len()
        );
        Ok(store)
    }

    pub fn notification(&self, name: &str) -> Result<&str, AppError> {
        self.notifications
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::TemplateMissing(name.to_string()))
    }

    pub fn page(&self, name: &str) -> Result<&str, AppError> {
        if !is_valid_page_name(name) {
            return Err(AppError::TemplateMissing(name.to_string()));
        }
        self.pages
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::TemplateMissing(name.to_string()))
    }

    pub fn render_notification(
        &self,
        name: &str,
        vars: &[(&'static str, String)],
    ) -> Result<String, AppError> {
        Ok(render(self.notification(name)?, vars))
    }

    pub fn render_page(&self, name: &str, vars: &[(&'static str, String)]) -> Result<String, AppError> {
        Ok(render(self.page(name)?, vars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn payload() -> SubmissionPayload {
        SubmissionPayload {
            dealer_id: "d1".to_string(),
            dealer_name: "Main Street Motors".to_string(),
            dealer_phone: "5125550199".to_string(),
            adf_email: "c@z.com".to_string(),
            additional_adf_emails: String::new(),
            contact_email: None,
            first_name: "Jane".to_string(),
            middle_initial: "Q".to_string(),
            last_name: "Doe".to_string(),
            suffix: String::new(),
            address: "100 Congress Ave".to_string(),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            zip: "78701".to_string(),
            home_phone: "12345".to_string(),
            mobile_phone: "5125550100".to_string(),
            email: "jane@example.com".to_string(),
            consent_given: true,
            recaptcha: "tok".to_string(),
        }
    }

    #[test]
    fn test_render_is_literal() {
        let vars = vec![("FIRST_NAME", "<b>Jane</b> & co".to_string())];
        assert_eq!(
            render("Hi {{FIRST_NAME}}, {{FIRST_NAME}}! {{UNKNOWN}}", &vars),
            "Hi <b>Jane</b> & co, <b>Jane</b> & co! {{UNKNOWN}}"
        );
    }

    #[test]
    fn test_submission_vars_format_phones() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 14, 30, 0).unwrap();
        let vars = submission_vars(&payload(), at);
        let get = |k: &str| vars.iter().find(|(n, _)| *n == k).unwrap().1.clone();
        assert_eq!(get("MOBILE_PHONE"), "512-555-0100");
        assert_eq!(get("HOME_PHONE"), "12345");
        assert_eq!(get("REQUEST_DATE"), "2026-10-16T14:30:00+00:00");
    }

    #[test]
    fn test_builtin_adf_is_fully_substituted() {
        let store = TemplateStore::builtin();
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 14, 30, 0).unwrap();
        let adf = store
            .render_notification(ADF_TEMPLATE, &submission_vars(&payload(), at))
            .unwrap();
        assert!(adf.contains("<name part=\"first\">Jane</name>"));
        assert!(adf.contains("<postalcode>78701</postalcode>"));
        assert!(!adf.contains("{{"));
    }

    #[test]
    fn test_pages() {
        let store = TemplateStore::builtin();
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap();
        let html = store
            .render_page("privacy", &page_vars("Main Street Motors", "5125550199", "c@z.com", at))
            .unwrap();
        assert!(html.contains("Main Street Motors"));
        assert!(html.contains("512-555-0199"));
        assert!(html.contains("March 5, 2026"));

        assert!(matches!(store.page("faq"), Err(AppError::TemplateMissing(_))));
        assert!(matches!(store.page("../secrets"), Err(AppError::TemplateMissing(_))));
        assert!(matches!(store.page("contact"), Err(AppError::TemplateMissing(_))));
    }
}
