use serde::{Deserialize, Serialize};
use std::fmt;

/// Name suffixes offered by the form's suffix selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Suffix {
    #[serde(rename = "Jr")]
    Jr,
    #[serde(rename = "Sr")]
    Sr,
    #[serde(rename = "II")]
    II,
    #[serde(rename = "III")]
    III,
    #[serde(rename = "IV")]
    IV,
    #[serde(rename = "V")]
    V,
}

impl Suffix {
    pub const ALL: [Suffix; 6] = [
        Suffix::Jr,
        Suffix::Sr,
        Suffix::II,
        Suffix::III,
        Suffix::IV,
        Suffix::V,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Suffix::Jr => "Jr",
            Suffix::Sr => "Sr",
            Suffix::II => "II",
            Suffix::III => "III",
            Suffix::IV => "IV",
            Suffix::V => "V",
        }
    }

    /// Parses the selector value, tolerating a trailing period and case ("jr.").
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = raw.trim().trim_end_matches('.');
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(cleaned))
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw field values exactly as typed into the form.
///
/// This is the input of the validation engine and the record the session
/// clears after a successful submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApplicantForm {
    pub first_name: String,
    pub middle_initial: String,
    pub last_name: String,
    pub suffix: String,
    pub address: String,
    pub zip: String,
    pub city: String,
    pub state: String,
    pub home_phone: String,
    pub mobile_phone: String,
    pub email: String,
    pub consent_given: bool,
}

impl RawApplicantForm {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A validated, normalized applicant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub first_name: String,
    pub middle_initial: Option<String>,
    pub last_name: String,
    pub suffix: Option<Suffix>,
    pub address: String,
    pub zip: String,
    pub city: String,
    pub state: String,
    /// Ten digits, punctuation stripped.
    pub home_phone: Option<String>,
    /// Ten digits, punctuation stripped.
    pub mobile_phone: String,
    pub email: String,
    pub consent_given: bool,
}

/// Per-session dealership metadata, fetched once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerContext {
    /// Dealership identity token the widget was embedded with.
    pub id: String,
    pub name: String,
    pub phone: String,
    /// Primary ADF lead inbox.
    pub adf_email: String,
    #[serde(default)]
    pub additional_adf_emails: Vec<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

/// Dealer record as delivered by the credit backend inside `items`.
///
/// Additional ADF inboxes arrive as one comma-separated string.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DealerItems {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, rename = "adfEmail")]
    pub adf_email: String,
    #[serde(default, rename = "additionalAdfEmails")]
    pub additional_adf_emails: Option<String>,
    #[serde(default, rename = "contactEmail")]
    pub contact_email: Option<String>,
}

impl DealerItems {
    pub fn into_context(self, fallback_id: &str) -> DealerContext {
        let id = if self.token.trim().is_empty() {
            fallback_id.to_string()
        } else {
            self.token
        };
        DealerContext {
            id,
            name: self.name,
            phone: self.phone,
            adf_email: self.adf_email.trim().to_string(),
            additional_adf_emails: split_addresses(self.additional_adf_emails.as_deref()),
            contact_email: self
                .contact_email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
        }
    }
}

/// Splits a comma-separated address list, dropping blanks.
pub fn split_addresses(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One city/county/state match for a zip code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipCandidate {
    pub city: String,
    #[serde(default)]
    pub county: String,
    pub state: String,
}

/// The record sent to `/api/submit`: applicant + dealer + gating token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub dealer_id: String,
    pub dealer_name: String,
    pub dealer_phone: String,
    pub adf_email: String,
    /// Comma-separated, the way the dealer record stores it.
    #[serde(default)]
    pub additional_adf_emails: String,
    #[serde(default)]
    pub contact_email: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub middle_initial: String,
    pub last_name: String,
    #[serde(default)]
    pub suffix: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(default)]
    pub home_phone: String,
    pub mobile_phone: String,
    pub email: String,
    pub consent_given: bool,
    pub recaptcha: String,
}

impl SubmissionPayload {
    /// Merges a validated applicant with the session's dealer and a fresh token.
    pub fn build(applicant: &Applicant, dealer: &DealerContext, token: &str) -> Self {
        Self {
            dealer_id: dealer.id.clone(),
            dealer_name: dealer.name.clone(),
            dealer_phone: dealer.phone.clone(),
            adf_email: dealer.adf_email.clone(),
            additional_adf_emails: dealer.additional_adf_emails.join(","),
            contact_email: dealer.contact_email.clone(),
            first_name: applicant.first_name.clone(),
            middle_initial: applicant.middle_initial.clone().unwrap_or_default(),
            last_name: applicant.last_name.clone(),
            suffix: applicant
                .suffix
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
            address: applicant.address.clone(),
            city: applicant.city.clone(),
            state: applicant.state.clone(),
            zip: applicant.zip.clone(),
            home_phone: applicant.home_phone.clone().unwrap_or_default(),
            mobile_phone: applicant.mobile_phone.clone(),
            email: applicant.email.clone(),
            consent_given: applicant.consent_given,
            recaptcha: token.to_string(),
        }
    }

    /// The dealer half of the payload.
    pub fn dealer_context(&self) -> DealerContext {
        DealerContext {
            id: self.dealer_id.clone(),
            name: self.dealer_name.clone(),
            phone: self.dealer_phone.clone(),
            adf_email: self.adf_email.trim().to_string(),
            additional_adf_emails: self.additional_adf_list(),
            contact_email: self.contact_address().map(str::to_string),
        }
    }

    /// The applicant half of the payload, as raw form values.
    pub fn applicant_form(&self) -> RawApplicantForm {
        RawApplicantForm {
            first_name: self.first_name.clone(),
            middle_initial: self.middle_initial.clone(),
            last_name: self.last_name.clone(),
            suffix: self.suffix.clone(),
            address: self.address.clone(),
            zip: self.zip.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            home_phone: self.home_phone.clone(),
            mobile_phone: self.mobile_phone.clone(),
            email: self.email.clone(),
            consent_given: self.consent_given,
        }
    }

    pub fn additional_adf_list(&self) -> Vec<String> {
        split_addresses(Some(&self.additional_adf_emails))
    }

    pub fn contact_address(&self) -> Option<&str> {
        self.contact_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Wire types for the widget API
// ---------------------------------------------------------------------------

/// Body of `POST /api/data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "parentIP")]
    pub parent_ip: Option<String>,
}

/// The credit backend's `{error, items?, msg?}` envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendEnvelope<T> {
    pub error: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl<T> BackendEnvelope<T> {
    pub fn is_ok(&self) -> bool {
        self.error == 0
    }
}

/// Response of `POST /api/data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse {
    pub success: bool,
    pub data: BackendEnvelope<DealerItems>,
}

/// Body of `POST /api/zipcode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZipRequest {
    pub id: String,
    pub zip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZipContent {
    #[serde(default)]
    pub items: Vec<ZipCandidate>,
}

/// Response of `POST /api/zipcode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZipResponse {
    pub success: bool,
    #[serde(default)]
    pub content: ZipContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

/// Body of `POST /api/page`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

/// Response of `POST /api/submit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}
