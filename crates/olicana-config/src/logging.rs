//! How diagnostic events are rendered on stderr.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Rendering of one diagnostic event.
///
/// Text forms parse case-insensitively.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, suited to log collectors.
    #[default]
    Json,
    /// Terse text, suited to reading a plugin's stderr by hand.
    Compact,
}
