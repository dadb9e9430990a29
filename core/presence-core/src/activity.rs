//! Builds the activity shown on Discord for a resolved project.

use presence_protocol::{
    truncate_text, ActivityAssets, ActivityButton, ActivityTimestamps, PresenceActivity,
};

use crate::config::ActivityTemplate;
use crate::project_name::ProjectIdentity;

/// Text fields are cut to Discord's length limit so a long project name
/// still produces a publishable activity.
pub fn build_activity(
    template: &ActivityTemplate,
    project: &ProjectIdentity,
    start_timestamp: i64,
) -> PresenceActivity {
    PresenceActivity {
        state: truncate_text(&template.state),
        details: truncate_text(&format!("{}{}", template.details_prefix, project.name())),
        timestamps: ActivityTimestamps {
            start: start_timestamp,
        },
        assets: ActivityAssets {
            large_image: template.large_image.clone(),
            large_text: truncate_text(&template.large_text),
            small_image: template.small_image.clone(),
            small_text: truncate_text(&template.small_text),
        },
        buttons: template
            .buttons
            .iter()
            .map(|(label, url)| ActivityButton {
                label: label.clone(),
                url: url.clone(),
            })
            .collect(),
    }
}
