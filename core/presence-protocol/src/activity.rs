use serde::{Deserialize, Serialize};

use crate::ErrorInfo;

/// Longest `state`, `details` or asset text Discord accepts.
pub const MAX_TEXT_CHARS: usize = 128;
const MAX_BUTTONS: usize = 2;
const MAX_BUTTON_LABEL_CHARS: usize = 32;
const MAX_BUTTON_URL_CHARS: usize = 512;

/// Activity payload in the shape Discord expects inside `SET_ACTIVITY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceActivity {
    pub state: String,
    pub details: String,
    pub timestamps: ActivityTimestamps,
    pub assets: ActivityAssets,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<ActivityButton>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTimestamps {
    /// Unix seconds.
    pub start: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityAssets {
    pub large_image: String,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityButton {
    pub label: String,
    pub url: String,
}

impl PresenceActivity {
    /// Checks the limits Discord enforces server-side, so a bad activity is
    /// reported before it is sent.
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        require_text(&self.state, "state")?;
        require_text(&self.details, "details")?;
        limit_text(&self.assets.large_text, "assets.large_text")?;
        limit_text(&self.assets.small_text, "assets.small_text")?;

        if self.timestamps.start < 0 {
            return Err(ErrorInfo::new(
                "invalid_timestamp",
                "timestamps.start must not be negative",
            ));
        }

        if self.buttons.len() > MAX_BUTTONS {
            return Err(ErrorInfo::new(
                "too_many_buttons",
                format!("at most {} buttons are allowed", MAX_BUTTONS),
            ));
        }
        for button in &self.buttons {
            let label_chars = button.label.chars().count();
            if button.label.trim().is_empty() || label_chars > MAX_BUTTON_LABEL_CHARS {
                return Err(ErrorInfo::new(
                    "invalid_button",
                    format!(
                        "button label must be 1-{} characters",
                        MAX_BUTTON_LABEL_CHARS
                    ),
                ));
            }
            let is_http = button.url.starts_with("https://") || button.url.starts_with("http://");
            if !is_http || button.url.chars().count() > MAX_BUTTON_URL_CHARS {
                return Err(ErrorInfo::new(
                    "invalid_button",
                    format!("button url must be an http(s) url: {}", button.url),
                ));
            }
        }

        Ok(())
    }
}

/// Cuts `value` to at most [`MAX_TEXT_CHARS`] characters, never splitting a
/// multi-byte character.
pub fn truncate_text(value: &str) -> String {
    match value.char_indices().nth(MAX_TEXT_CHARS) {
        Some((end, _)) => value[..end].to_string(),
        None => value.to_string(),
    }
}

fn require_text(value: &str, field: &str) -> Result<(), ErrorInfo> {
    if value.trim().is_empty() {
        return Err(ErrorInfo::new(
            "missing_field",
            format!("{} is required", field),
        ));
    }
    limit_text(value, field)
}

fn limit_text(value: &str, field: &str) -> Result<(), ErrorInfo> {
    if value.chars().count() > MAX_TEXT_CHARS {
        return Err(ErrorInfo::new(
            "field_too_long",
            format!("{} must be {} characters or fewer", field, MAX_TEXT_CHARS),
        ));
    }
    Ok(())
}
