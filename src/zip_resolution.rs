use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::ZipCandidate;

/// Outcome of a zip lookup, by result cardinality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZipResolution {
    NoMatch,
    SingleMatch { city: String, state: String },
    MultipleMatches(Vec<ZipCandidate>),
}

impl ZipResolution {
    pub fn from_candidates(mut candidates: Vec<ZipCandidate>) -> Self {
        match candidates.len() {
            0 => ZipResolution::NoMatch,
            1 => {
                let only = candidates.remove(0);
                ZipResolution::SingleMatch {
                    city: only.city,
                    state: only.state,
                }
            }
            _ => ZipResolution::MultipleMatches(candidates),
        }
    }
}

/// Source of zip → city/county/state candidates.
#[async_trait]
pub trait ZipLookup: Send + Sync {
    async fn lookup_zip(&self, session_id: &str, zip: &str) -> Result<Vec<ZipCandidate>, AppError>;
}

/// Candidates awaiting an explicit user pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipPrompt {
    pub zip: String,
    pub candidates: Vec<ZipCandidate>,
}

/// Whether a zip edit should trigger an automatic decode: exactly five digits,
/// never a partial or +4 entry.
pub fn should_auto_decode(zip: &str) -> bool {
    zip.chars().count() == 5 && zip.chars().all(|c| c.is_ascii_digit())
}

/// The five-digit part the dataset is keyed by.
pub fn lookup_key(zip: &str) -> &str {
    let trimmed = zip.trim();
    trimmed.split('-').next().unwrap_or(trimmed)
}

/// Looks up `zip` for the session's dealer and classifies the result.
pub async fn resolve_zip(
    lookup: &dyn ZipLookup,
    zip: &str,
    session_id: &str,
) -> Result<ZipResolution, AppError> {
    let key = lookup_key(zip);
    let candidates = lookup.lookup_zip(session_id, key).await?;
    tracing::debug!("Zip {} resolved to {} candidate(s)", key, candidates.len());
    Ok(ZipResolution::from_candidates(candidates))
}
