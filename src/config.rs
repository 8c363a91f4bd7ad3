use serde::Deserialize;

pub const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
pub const DEFAULT_POSTMARK_API_URL: &str = "https://api.postmarkapp.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub prequal_api_url: String,
    pub prequal_api_token: Option<String>,
    pub zip_api_url: String,
    pub recaptcha_secret: String,
    pub recaptcha_verify_url: String,
    pub recaptcha_min_score: f64,
    pub postmark_token: String,
    pub postmark_api_url: String,
    pub email_from: String,
    /// Fixed internal address copied on every notification.
    pub oversight_email: String,
    pub template_dir: Option<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .map_err(|_| anyhow::anyhow!("{} environment variable required", name))
        .and_then(|value| {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            Ok(value.trim().to_string())
        })
}

fn http_url(name: &str, value: String) -> anyhow::Result<String> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn email_address(name: &str, value: String) -> anyhow::Result<String> {
    if !value.contains('@') {
        anyhow::bail!("{} must be an email address", name);
    }
    Ok(value)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            prequal_api_url: required("PREQUAL_API_URL")
                .and_then(|url| http_url("PREQUAL_API_URL", url))?,
            prequal_api_token: optional("PREQUAL_API_TOKEN"),
            zip_api_url: required("ZIP_API_URL").and_then(|url| http_url("ZIP_API_URL", url))?,
            recaptcha_secret: required("RECAPTCHA_SECRET")?,
            recaptcha_verify_url: http_url(
                "RECAPTCHA_VERIFY_URL",
                optional("RECAPTCHA_VERIFY_URL")
                    .unwrap_or_else(|| DEFAULT_RECAPTCHA_VERIFY_URL.to_string()),
            )?,
            recaptcha_min_score: optional("RECAPTCHA_MIN_SCORE")
                .map(|s| s.parse::<f64>())
                .transpose()
                .map_err(|_| anyhow::anyhow!("RECAPTCHA_MIN_SCORE must be a number"))?
                .unwrap_or(0.5)
                .clamp(0.0, 1.0),
            postmark_token: required("POSTMARK_TOKEN")?,
            postmark_api_url: http_url(
                "POSTMARK_API_URL",
                optional("POSTMARK_API_URL")
                    .unwrap_or_else(|| DEFAULT_POSTMARK_API_URL.to_string()),
            )?,
            email_from: required("EMAIL_FROM").and_then(|e| email_address("EMAIL_FROM", e))?,
            oversight_email: required("OVERSIGHT_EMAIL")
                .and_then(|e| email_address("OVERSIGHT_EMAIL", e))?,
            template_dir: optional("TEMPLATE_DIR"),
            rate_limit_per_second: optional("RATE_LIMIT_PER_SECOND")
                .map(|s| s.parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a number"))?
                .unwrap_or(10),
            rate_limit_burst: optional("RATE_LIMIT_BURST")
                .map(|s| s.parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a number"))?
                .unwrap_or(20),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Prequal API URL: {}", config.prequal_api_url);
        tracing::debug!("Zip API URL: {}", config.zip_api_url);
        tracing::debug!("CAPTCHA min score: {}", config.recaptcha_min_score);
        if let Some(ref dir) = config.template_dir {
            tracing::info!("Template overrides directory: {}", dir);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
