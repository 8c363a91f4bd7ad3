//! Widget configuration surface: theming and behaviour read from the iframe's
//! URL query string.
//!
//! Every parameter is optional. Style values are CSS strings passed through to
//! the stylesheet; a value that could break out of a declaration is ignored and
//! the default kept.
//!
//! | parameter            | alias            | default         |
//! |----------------------|------------------|-----------------|
//! | `id`                 |                  | none            |
//! | `primaryColor`       |                  | `#d8534e`       |
//! | `successPageEnabled` | `successPage`    | `false`         |
//! | `successLogo`        |                  | none            |
//! | `dealerLoc`          | `location`       | none            |
//! | `btnType`            | `buttonStyle`    | `standard`      |
//! | `borderRadius`       |                  | `4px`           |
//! | `borderWidth`        |                  | `2px`           |
//! | `borderColor`        |                  | `#000000`       |
//! | `color`              |                  | `#ffffff`       |
//! | `bgColor`            |                  | `rgba(0,0,0,1)` |
//! | `hColor`             | `hoverTextColor` | `#ffffff`       |
//! | `hBorderC`           |                  | `#000000`       |
//! | `bgHColor`           | `hoverColor`     | `#000000`       |
//! | `opacity`            |                  | `1`             |
//! | `thickness`          |                  | `2`             |

use serde::Serialize;
use url::form_urlencoded;

/// `standard` buttons are flat; `styled` buttons get the border and the hover
/// colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonType {
    #[default]
    Standard,
    Styled,
}

impl ButtonType {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" | "solid" => Some(ButtonType::Standard),
            "styled" | "outline" => Some(ButtonType::Styled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOptions {
    pub dealer_id: Option<String>,
    pub primary_color: String,
    pub success_page_enabled: bool,
    pub success_logo: Option<String>,
    pub dealer_location: Option<String>,
    pub button_type: ButtonType,
    pub border_radius: String,
    pub border_width: String,
    pub border_color: String,
    pub color: String,
    pub background_color: String,
    pub hover_color: String,
    pub hover_border_color: String,
    pub hover_background_color: String,
    pub opacity: f32,
    pub thickness: String,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            dealer_id: None,
            primary_color: "#d8534e".to_string(),
            success_page_enabled: false,
            success_logo: None,
            dealer_location: None,
            button_type: ButtonType::Standard,
            border_radius: "4px".to_string(),
            border_width: "2px".to_string(),
            border_color: "#000000".to_string(),
            color: "#ffffff".to_string(),
            background_color: "rgba(0,0,0,1)".to_string(),
            hover_color: "#ffffff".to_string(),
            hover_border_color: "#000000".to_string(),
            hover_background_color: "#000000".to_string(),
            opacity: 1.0,
            thickness: "2".to_string(),
        }
    }
}

/// A CSS value safe to place inside a declaration.
fn css_value(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty()
        || value.len() > 64
        || value.chars().any(|c| {
            matches!(c, ';' | '{' | '}' | '<' | '>' | '"' | '\'' | '\\') || c.is_control()
        })
    {
        return None;
    }
    Some(value.to_string())
}

/// Colors: bare hex digits get their `#` back, since a raw `#` cannot travel
/// unescaped in a query string.
fn css_color(raw: &str) -> Option<String> {
    let value = css_value(raw)?;
    if matches!(value.len(), 3 | 6 | 8) && value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Some(format!("#{}", value.to_ascii_lowercase()));
    }
    Some(value)
}

/// Lengths: a bare number is taken as pixels.
fn css_length(raw: &str) -> Option<String> {
    let value = css_value(raw)?;
    if value.parse::<f32>().is_ok() {
        Some(format!("{}px", value))
    } else {
        Some(value)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl WidgetOptions {
    /// Parses a query string (with or without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let mut options = Self::default();
        let query = query.trim_start_matches('?');

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let applied = match key.as_ref() {
                "id" => non_empty(&value).map(|v| options.dealer_id = Some(v)),
                "primaryColor" => css_color(&value).map(|v| options.primary_color = v),
                "successPageEnabled" | "successPage" => {
                    parse_bool(&value).map(|v| options.success_page_enabled = v)
                }
                "successLogo" => non_empty(&value).map(|v| options.success_logo = Some(v)),
                "dealerLoc" | "location" => {
                    non_empty(&value).map(|v| options.dealer_location = Some(v))
                }
                "btnType" | "buttonStyle" => {
                    ButtonType::parse(&value).map(|v| options.button_type = v)
                }
                "borderRadius" => css_length(&value).map(|v| options.border_radius = v),
                "borderWidth" => css_length(&value).map(|v| options.border_width = v),
                "borderColor" => css_color(&value).map(|v| options.border_color = v),
                "color" => css_color(&value).map(|v| options.color = v),
                "bgColor" => css_color(&value).map(|v| options.background_color = v),
                "hColor" | "hoverTextColor" => css_color(&value).map(|v| options.hover_color = v),
                "hBorderC" => css_color(&value).map(|v| options.hover_border_color = v),
                "bgHColor" | "hoverColor" => {
                    css_color(&value).map(|v| options.hover_background_color = v)
                }
                "opacity" => value
                    .trim()
                    .parse::<f32>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| options.opacity = v.clamp(0.0, 1.0)),
                "thickness" => css_value(&value).map(|v| options.thickness = v),
                // unknown parameters belong to the host page
                _ => Some(()),
            };
            if applied.is_none() {
                tracing::warn!("Ignoring invalid widget option {}={}", key, value);
            }
        }

        options
    }

    /// CSS custom properties for the form's stylesheet. Standard buttons have
    /// no border and no hover change.
    pub fn css_variables(&self) -> Vec<(&'static str, String)> {
        let styled = self.button_type == ButtonType::Styled;
        let pick = |styled_value: &str, plain: &str| {
            if styled {
                styled_value.to_string()
            } else {
                plain.to_string()
            }
        };
        vec![
            ("--pq-primary", self.primary_color.clone()),
            ("--pq-border-radius", self.border_radius.clone()),
            ("--pq-border-width", pick(&self.border_width, "0")),
            ("--pq-border-color", pick(&self.border_color, "transparent")),
            ("--pq-color", self.color.clone()),
            ("--pq-bg", self.background_color.clone()),
            ("--pq-hover-color", pick(&self.hover_color, &self.color)),
            (
                "--pq-hover-border",
                pick(&self.hover_border_color, "transparent"),
            ),
            (
                "--pq-hover-bg",
                pick(&self.hover_background_color, &self.background_color),
            ),
            (
                "--pq-hover-opacity",
                if styled {
                    format!("{}", self.opacity)
                } else {
                    "1".to_string()
                },
            ),
            ("--pq-thickness", self.thickness.clone()),
        ]
    }

    /// The properties as a `:root { ... }` block.
    pub fn stylesheet(&self) -> String {
        let body: String = self
            .css_variables()
            .into_iter()
            .map(|(name, value)| format!("  {}: {};\n", name, value))
            .collect();
        format!(":root {{\n{}}}\n", body)
    }
}
