//! Chart and series descriptions returned by `get_chart_config` and
//! `get_series_config`.

use serde::{Deserialize, Serialize};

/// Default series colour palette shared by the plugins.
pub const CHART_COLORS: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// Layout of the chart the host should draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartConfig {
    title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    axis_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    axes: Vec<AxisGroup>,
}

impl ChartConfig {
    /// Creates a chart with a title only.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            axis_labels: Vec::new(),
            axes: Vec::new(),
        }
    }

    /// Sets simple `[x, y]` axis labels.
    #[must_use]
    pub fn with_axis_labels(mut self, x: impl Into<String>, y: impl Into<String>) -> Self {
        self.axis_labels = vec![x.into(), y.into()];
        self
    }

    /// Adds an axis group.
    #[must_use]
    pub fn with_axes(mut self, group: AxisGroup) -> Self {
        self.axes.push(group);
        self
    }

    /// Returns the chart title.
    #[must_use]
    pub const fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Returns the simple axis labels, if set.
    #[must_use]
    pub fn axis_labels(&self) -> &[String] {
        &self.axis_labels
    }

    /// Returns the axis groups.
    #[must_use]
    pub fn axes(&self) -> &[AxisGroup] {
        &self.axes
    }
}

/// Axes attached to one subplot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisGroup {
    subplot: [u32; 2],
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    x_axes: Vec<Axis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    y_axes: Vec<Axis>,
}

impl AxisGroup {
    /// Creates a group for the subplot at `row`, `col`.
    #[must_use]
    pub const fn new(row: u32, col: u32) -> Self {
        Self {
            subplot: [row, col],
            x_axes: Vec::new(),
            y_axes: Vec::new(),
        }
    }

    /// Adds an x axis.
    #[must_use]
    pub fn with_x_axis(mut self, axis: Axis) -> Self {
        self.x_axes.push(axis);
        self
    }

    /// Adds a y axis.
    #[must_use]
    pub fn with_y_axis(mut self, axis: Axis) -> Self {
        self.y_axes.push(axis);
        self
    }
}

/// Scale used to render an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    /// Linear numeric axis.
    Linear,
    /// Logarithmic axis.
    Log,
    /// Values are Unix timestamps in seconds.
    Date,
}

/// One chart axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    title: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<AxisKind>,
}

impl Axis {
    /// Creates an axis with the host's default scale.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: None,
        }
    }

    /// Creates a date axis.
    #[must_use]
    pub fn date(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: Some(AxisKind::Date),
        }
    }
}

/// Metadata for one series the plugin can serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesConfig {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

impl SeriesConfig {
    /// Creates a series entry without a colour.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
        }
    }

    /// Sets the line colour.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Returns the series identifier passed back in `get_series_data`.
    #[must_use]
    pub const fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the colour, if set.
    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}
