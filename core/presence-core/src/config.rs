//! Runtime configuration.
//!
//! Everything the daemon needs to know about Unity, Discord and its own
//! cadence lives here. There is no config file: `PresenceConfig::default()`
//! is the whole configuration, and tests build their own values.

use std::path::PathBuf;
use std::time::Duration;

/// Discord application that owns the presence assets.
pub const DISCORD_APPLICATION_ID: &str = "1382561570973945856";

pub const UNKNOWN_PROJECT: &str = "Unknown Project";

const TICK_INTERVAL: Duration = Duration::from_secs(5);
const TITLE_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub application_id: String,
    /// Editor process names, in priority order.
    pub editor_process_names: Vec<String>,
    /// Discord process names; any running instance counts.
    pub host_process_names: Vec<String>,
    pub tick_interval: Duration,
    /// One-shot wait when the editor's window title is still empty.
    pub title_wait: Duration,
    pub title_rules: TitleRules,
    pub history: HistoryConfig,
    pub activity: ActivityTemplate,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            application_id: DISCORD_APPLICATION_ID.to_string(),
            editor_process_names: strings(&["Unity", "Unity.exe", "UnityHub", "Unity Hub"]),
            host_process_names: strings(&[
                "Discord",
                "DiscordPTB",
                "DiscordCanary",
                "discord",
                "discord-ptb",
                "discord-canary",
            ]),
            tick_interval: TICK_INTERVAL,
            title_wait: TITLE_WAIT,
            title_rules: TitleRules::default(),
            history: HistoryConfig::default(),
            activity: ActivityTemplate::default(),
        }
    }
}

/// Markers used to pick the project name out of the editor window title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRules {
    pub brand: String,
    pub scene_suffix: String,
    /// Tried in order; the first that yields a usable part wins.
    pub separators: Vec<String>,
}

impl Default for TitleRules {
    fn default() -> Self {
        Self {
            brand: "Unity".to_string(),
            scene_suffix: ".unity".to_string(),
            separators: strings(&[" - ", " \u{2013} ", " \u{2014} ", " \u{2012} ", " \u{2212} "]),
        }
    }
}

/// Location of Unity's per-version "recently used" history file:
/// `<app data>/<vendor_dir>/Editor-<version>/<file_name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// `None` disables the history fallback.
    pub app_data_dir: Option<PathBuf>,
    pub vendor_dir: String,
    pub file_name: String,
    /// Checked in order; the first existing file wins.
    pub editor_versions: Vec<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            app_data_dir: dirs::config_dir(),
            vendor_dir: "Unity".to_string(),
            file_name: "RecentlyUsedAssetPaths.txt".to_string(),
            editor_versions: strings(&["2022.3", "2021.3", "2020.3", "2019.4", "2023.1", "2023.2"]),
        }
    }
}

impl HistoryConfig {
    pub fn history_path(&self, app_data_dir: &std::path::Path, version: &str) -> PathBuf {
        app_data_dir
            .join(&self.vendor_dir)
            .join(format!("Editor-{}", version))
            .join(&self.file_name)
    }
}

/// Static parts of the activity shown on Discord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityTemplate {
    pub state: String,
    /// Prefixed to the project name to form the details line.
    pub details_prefix: String,
    pub large_image: String,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
    /// `(label, url)` pairs.
    pub buttons: Vec<(String, String)>,
}

impl Default for ActivityTemplate {
    fn default() -> Self {
        Self {
            state: "Unity Editor".to_string(),
            details_prefix: "Editing: ".to_string(),
            large_image: "unity_logo".to_string(),
            large_text: "Unity Editor".to_string(),
            small_image: "csharp".to_string(),
            small_text: "C# Background Tool".to_string(),
            buttons: vec![(
                "Join".to_string(),
                "https://github.com/inborastudio".to_string(),
            )],
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn history_path_is_version_specific() {
        let config = HistoryConfig::default();
        let path = config.history_path(Path::new("/appdata"), "2022.3");
        assert_eq!(
            path,
            Path::new("/appdata/Unity/Editor-2022.3/RecentlyUsedAssetPaths.txt")
        );
    }

    #[test]
    fn default_editor_names_start_with_unity() {
        let config = PresenceConfig::default();
        assert_eq!(config.editor_process_names[0], "Unity");
        assert_eq!(config.tick_interval, Duration::from_secs(5));
    }

    #[test]
    fn default_activity_template_matches_published_assets() {
        let template = ActivityTemplate::default();
        assert_eq!(template.small_image, "csharp");
        assert_eq!(template.small_text, "C# Background Tool");
        assert_eq!(template.large_text, "Unity Editor");
    }
}
