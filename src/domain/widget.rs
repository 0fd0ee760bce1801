// Widget instance model: kinds, geometry, typed per-kind config and chart style
use super::ids::{DataSourceId, WidgetId};
use super::registry;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Smallest width/height that keeps a widget grabbable on the canvas.
pub const MIN_WIDGET_SIZE: u32 = 50;
pub const DEFAULT_WIDTH: u32 = 300;
pub const DEFAULT_HEIGHT: u32 = 200;
pub const PRIMARY_COLOR: &str = "hsl(var(--primary))";

pub const DEFAULT_PALETTE: [&str; 10] = [
    "#8884d8", "#82ca9d", "#ffc658", "#ff7c7c", "#8dd1e1", "#d084d0", "#ffb347", "#87ceeb",
    "#dda0dd", "#98fb98",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WidgetError {
    #[error("unknown widget type '{0}'")]
    UnknownKind(String),
    #[error("invalid {kind} config: {message}")]
    InvalidConfig { kind: WidgetKind, message: String },
    #[error("invalid style: {0}")]
    InvalidStyle(String),
    #[error("{dimension} must be at least {min}px, got {value}", min = MIN_WIDGET_SIZE)]
    TooSmall { dimension: &'static str, value: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    #[serde(alias = "bar")]
    BarChart,
    #[serde(alias = "line")]
    LineChart,
    #[serde(alias = "area")]
    AreaChart,
    #[serde(alias = "pie")]
    PieChart,
    ScatterPlot,
    #[serde(alias = "kpi")]
    KpiCard,
    Metric,
    Gauge,
    Table,
    #[serde(alias = "text")]
    TextBox,
    Image,
    Filter,
    Button,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 13] = [
        WidgetKind::BarChart,
        WidgetKind::LineChart,
        WidgetKind::AreaChart,
        WidgetKind::PieChart,
        WidgetKind::ScatterPlot,
        WidgetKind::KpiCard,
        WidgetKind::Metric,
        WidgetKind::Gauge,
        WidgetKind::Table,
        WidgetKind::TextBox,
        WidgetKind::Image,
        WidgetKind::Filter,
        WidgetKind::Button,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WidgetKind::BarChart => "bar-chart",
            WidgetKind::LineChart => "line-chart",
            WidgetKind::AreaChart => "area-chart",
            WidgetKind::PieChart => "pie-chart",
            WidgetKind::ScatterPlot => "scatter-plot",
            WidgetKind::KpiCard => "kpi-card",
            WidgetKind::Metric => "metric",
            WidgetKind::Gauge => "gauge",
            WidgetKind::Table => "table",
            WidgetKind::TextBox => "text-box",
            WidgetKind::Image => "image",
            WidgetKind::Filter => "filter",
            WidgetKind::Button => "button",
        }
    }

    pub fn is_chart(self) -> bool {
        matches!(
            self,
            WidgetKind::BarChart
                | WidgetKind::LineChart
                | WidgetKind::AreaChart
                | WidgetKind::PieChart
                | WidgetKind::ScatterPlot
        )
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = WidgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| WidgetError::UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Default-sized box with its top-left corner at `(x, y)`.
    pub fn at(x: u32, y: u32) -> Self {
        Self::new(x, y, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    pub fn offset(self, dx: u32, dy: u32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..self
        }
    }

    fn check_size(&self) -> Result<(), WidgetError> {
        if self.width < MIN_WIDGET_SIZE {
            return Err(WidgetError::TooSmall {
                dimension: "width",
                value: self.width,
            });
        }
        if self.height < MIN_WIDGET_SIZE {
            return Err(WidgetError::TooSmall {
                dimension: "height",
                value: self.height,
            });
        }
        Ok(())
    }
}

/// `Default` from field values, for config and style structs.
macro_rules! defaults {
    ($ty:ident { $($field:ident: $value:expr),* $(,)? }) => {
        impl Default for $ty {
            fn default() -> Self {
                Self { $($field: $value),* }
            }
        }
    };
}

/// Per-kind config enum plus the JSON dispatch every variant shares.
macro_rules! widget_config {
    ($(#[$meta:meta])* pub enum $name:ident { $($variant:ident($config:ty)),* $(,)? }) => {
        $(#[$meta])*
        pub enum $name {
            $($variant($config)),*
        }

        impl $name {
            /// Decode `value` into the same variant as `self`.
            fn decode_as(&self, value: Value) -> serde_json::Result<Self> {
                Ok(match self {
                    $($name::$variant(_) => $name::$variant(serde_json::from_value(value)?)),*
                })
            }

            pub fn to_json(&self) -> Map<String, Value> {
                match self {
                    $($name::$variant(c) => object(c)),*
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KpiConfig {
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    pub change: f64,
    pub change_type: ChangeType,
}

defaults!(KpiConfig {
    value: "12,345".to_string(),
    change: 12.5,
    change_type: ChangeType::Increase,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GaugeConfig {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

defaults!(GaugeConfig {
    value: 75.0,
    min: 0.0,
    max: 100.0,
    color: None,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableConfig {
    pub columns: Vec<String>,
    pub page_size: u32,
}

defaults!(TableConfig {
    columns: vec!["name".to_string(), "value".to_string()],
    page_size: 10,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextConfig {
    pub content: String,
    pub font_size: u32,
}

defaults!(TextConfig {
    content: "Add your text content here".to_string(),
    font_size: 16,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageConfig {
    pub src: String,
    pub alt: String,
}

defaults!(ImageConfig {
    src: String::new(),
    alt: "Image".to_string(),
});

/// Input control rendered by a `filter` widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    #[default]
    Dropdown,
    Text,
    DateRange,
    Number,
}

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Dropdown => "dropdown",
            FilterKind::Text => "text",
            FilterKind::DateRange => "dateRange",
            FilterKind::Number => "number",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterWidgetConfig {
    #[serde(rename = "type")]
    pub control: FilterKind,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ButtonConfig {
    pub label: String,
    pub action: String,
}

defaults!(ButtonConfig {
    label: "Click me".to_string(),
    action: "custom".to_string(),
});

widget_config! {
    /// Per-kind configuration. The variant is always the one `WidgetConfig::default_for`
    /// returns for the owning widget's kind.
    #[derive(Debug, Clone, PartialEq)]
    pub enum WidgetConfig {
        Chart(ChartConfig),
        Kpi(KpiConfig),
        Gauge(GaugeConfig),
        Table(TableConfig),
        Text(TextConfig),
        Image(ImageConfig),
        Filter(FilterWidgetConfig),
        Button(ButtonConfig),
    }
}

impl WidgetConfig {
    pub fn default_for(kind: WidgetKind) -> Self {
        match kind {
            WidgetKind::PieChart => WidgetConfig::Chart(ChartConfig {
                color: Some(PRIMARY_COLOR.to_string()),
                data_key: Some("value".to_string()),
                name_key: Some("name".to_string()),
                ..ChartConfig::default()
            }),
            WidgetKind::BarChart
            | WidgetKind::LineChart
            | WidgetKind::AreaChart
            | WidgetKind::ScatterPlot => WidgetConfig::Chart(ChartConfig {
                color: Some(PRIMARY_COLOR.to_string()),
                data_key: Some("value".to_string()),
                x_axis_key: Some("name".to_string()),
                ..ChartConfig::default()
            }),
            WidgetKind::KpiCard | WidgetKind::Metric => WidgetConfig::Kpi(KpiConfig::default()),
            WidgetKind::Gauge => WidgetConfig::Gauge(GaugeConfig {
                color: Some(PRIMARY_COLOR.to_string()),
                ..GaugeConfig::default()
            }),
            WidgetKind::Table => WidgetConfig::Table(TableConfig::default()),
            WidgetKind::TextBox => WidgetConfig::Text(TextConfig::default()),
            WidgetKind::Image => WidgetConfig::Image(ImageConfig::default()),
            WidgetKind::Filter => WidgetConfig::Filter(FilterWidgetConfig::default()),
            WidgetKind::Button => WidgetConfig::Button(ButtonConfig::default()),
        }
    }

    /// Decode a persisted config object for `kind`. Unknown keys are dropped.
    pub fn from_json(kind: WidgetKind, map: Map<String, Value>) -> Result<Self, WidgetError> {
        let config = WidgetConfig::default_for(kind)
            .decode_as(Value::Object(map))
            .map_err(|e| WidgetError::InvalidConfig {
                kind,
                message: e.to_string(),
            })?;
        config.validate(kind)?;
        Ok(config)
    }

    /// Shallow merge: keys in `patch` replace existing keys, everything else is kept.
    pub fn merged(&self, kind: WidgetKind, patch: &Map<String, Value>) -> Result<Self, WidgetError> {
        let mut map = self.to_json();
        for (key, value) in patch {
            map.insert(key.clone(), value.clone());
        }
        WidgetConfig::from_json(kind, map)
    }

    pub fn color(&self) -> Option<&str> {
        match self {
            WidgetConfig::Chart(c) => c.color.as_deref(),
            WidgetConfig::Gauge(c) => c.color.as_deref(),
            _ => None,
        }
    }

    fn validate(&self, kind: WidgetKind) -> Result<(), WidgetError> {
        let fail = |message: &str| {
            Err(WidgetError::InvalidConfig {
                kind,
                message: message.to_string(),
            })
        };
        match self {
            WidgetConfig::Chart(c) if c.color.as_deref().is_some_and(|s| s.trim().is_empty()) => {
                fail("color must not be empty")
            }
            WidgetConfig::Kpi(c) if !c.change.is_finite() => fail("change must be a finite number"),
            WidgetConfig::Gauge(c) if !(c.min < c.max) => fail("gauge min must be below max"),
            WidgetConfig::Table(c) if c.page_size == 0 => fail("page size must be positive"),
            WidgetConfig::Text(c) if c.font_size == 0 => fail("font size must be positive"),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegendStyle {
    pub show: bool,
    pub position: LegendPosition,
}

defaults!(LegendStyle {
    show: true,
    position: LegendPosition::Bottom,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AxesStyle {
    pub show_x: bool,
    pub show_y: bool,
    pub x_label: String,
    pub y_label: String,
}

defaults!(AxesStyle {
    show_x: true,
    show_y: true,
    x_label: String::new(),
    y_label: String::new(),
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TitleStyle {
    pub show: bool,
    pub text: String,
    pub font_size: u32,
}

defaults!(TitleStyle {
    show: false,
    text: String::new(),
    font_size: 16,
});

/// Visual overrides for chart widgets, independent of `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetStyle {
    pub colors: Vec<String>,
    pub grid_lines: bool,
    pub legend: LegendStyle,
    pub axes: AxesStyle,
    pub title: TitleStyle,
    pub animation: bool,
    pub opacity: f64,
}

impl Default for WidgetStyle {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE[..5].iter().map(|c| c.to_string()).collect(),
            grid_lines: true,
            legend: LegendStyle::default(),
            axes: AxesStyle::default(),
            title: TitleStyle::default(),
            animation: true,
            opacity: 1.0,
        }
    }
}

impl WidgetStyle {
    pub fn merged(&self, patch: &Map<String, Value>) -> Result<Self, WidgetError> {
        let mut map = object(self);
        for (key, value) in patch {
            map.insert(key.clone(), value.clone());
        }
        let style: WidgetStyle = serde_json::from_value(Value::Object(map))
            .map_err(|e| WidgetError::InvalidStyle(e.to_string()))?;
        if !(0.0..=1.0).contains(&style.opacity) {
            return Err(WidgetError::InvalidStyle(format!(
                "opacity must be within 0..=1, got {}",
                style.opacity
            )));
        }
        if style.title.font_size == 0 {
            return Err(WidgetError::InvalidStyle("title font size must be positive".to_string()));
        }
        Ok(style)
    }

    pub fn to_json(&self) -> Map<String, Value> {
        object(self)
    }
}

/// Partial update for one widget. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetPatch {
    pub title: Option<String>,
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub config: Option<Map<String, Value>>,
    pub style: Option<Map<String, Value>>,
    /// `Some(None)` clears the reference.
    pub data_source: Option<Option<DataSourceId>>,
}

impl WidgetPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn position(x: u32, y: u32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn geometry(geometry: Geometry) -> Self {
        Self {
            x: Some(geometry.x),
            y: Some(geometry.y),
            width: Some(geometry.width),
            height: Some(geometry.height),
            ..Self::default()
        }
    }

    pub fn config(config: Map<String, Value>) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    pub fn config_key(key: &str, value: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert(key.to_string(), value.into());
        Self::config(map)
    }

    pub fn style_key(key: &str, value: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert(key.to_string(), value.into());
        Self {
            style: Some(map),
            ..Self::default()
        }
    }

    pub fn data_source(source: Option<DataSourceId>) -> Self {
        Self {
            data_source: Some(source),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WidgetRecord", into = "WidgetRecord")]
pub struct WidgetInstance {
    id: WidgetId,
    kind: WidgetKind,
    pub title: String,
    pub geometry: Geometry,
    config: WidgetConfig,
    pub style: Option<WidgetStyle>,
    pub data_source: Option<DataSourceId>,
}

impl WidgetInstance {
    pub fn new(id: WidgetId, kind: WidgetKind, geometry: Geometry) -> Self {
        Self {
            id,
            kind,
            title: format!("New {}", registry::entry(kind).name),
            geometry,
            config: WidgetConfig::default_for(kind),
            style: kind.is_chart().then(WidgetStyle::default),
            data_source: None,
        }
    }

    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    pub fn kind(&self) -> WidgetKind {
        self.kind
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Copy under a new id, shifted by `(dx, dy)`, titled "<title> Copy".
    pub fn duplicate(&self, id: WidgetId, dx: u32, dy: u32) -> Self {
        Self {
            id,
            title: format!("{} Copy", self.title),
            geometry: self.geometry.offset(dx, dy),
            ..self.clone()
        }
    }

    /// Apply a partial update. Nothing is written unless every part of the
    /// patch is valid.
    pub fn apply(&mut self, patch: WidgetPatch) -> Result<(), WidgetError> {
        let config = match &patch.config {
            Some(p) => self.config.merged(self.kind, p)?,
            None => self.config.clone(),
        };
        let style = match &patch.style {
            Some(p) => Some(self.style.clone().unwrap_or_default().merged(p)?),
            None => self.style.clone(),
        };
        let geometry = Geometry {
            x: patch.x.unwrap_or(self.geometry.x),
            y: patch.y.unwrap_or(self.geometry.y),
            width: patch.width.unwrap_or(self.geometry.width),
            height: patch.height.unwrap_or(self.geometry.height),
        };
        geometry.check_size()?;

        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(source) = patch.data_source {
            self.data_source = source;
        }
        self.geometry = geometry;
        self.config = config;
        self.style = style;
        Ok(())
    }
}

/// Persisted shape of one widget inside a page's `visualizations` array.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WidgetRecord {
    id: WidgetId,
    #[serde(rename = "type")]
    kind: WidgetKind,
    #[serde(alias = "name", default)]
    title: String,
    #[serde(deserialize_with = "pixel")]
    x: u32,
    #[serde(deserialize_with = "pixel")]
    y: u32,
    #[serde(deserialize_with = "pixel")]
    width: u32,
    #[serde(deserialize_with = "pixel")]
    height: u32,
    #[serde(default)]
    config: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<WidgetStyle>,
    #[serde(default, alias = "data_source_id", skip_serializing_if = "Option::is_none")]
    data_source_id: Option<DataSourceId>,
}

impl TryFrom<WidgetRecord> for WidgetInstance {
    type Error = WidgetError;

    fn try_from(record: WidgetRecord) -> Result<Self, Self::Error> {
        let config = WidgetConfig::from_json(record.kind, record.config.unwrap_or_default())?;
        Ok(Self {
            id: record.id,
            kind: record.kind,
            title: record.title,
            geometry: Geometry {
                x: record.x,
                y: record.y,
                width: record.width.max(MIN_WIDGET_SIZE),
                height: record.height.max(MIN_WIDGET_SIZE),
            },
            config,
            style: record.style,
            data_source: record.data_source_id.filter(|id| !id.as_str().is_empty()),
        })
    }
}

impl From<WidgetInstance> for WidgetRecord {
    fn from(widget: WidgetInstance) -> Self {
        Self {
            id: widget.id,
            kind: widget.kind,
            title: widget.title,
            x: widget.geometry.x,
            y: widget.geometry.y,
            width: widget.geometry.width,
            height: widget.geometry.height,
            config: Some(widget.config.to_json()),
            style: widget.style,
            data_source_id: widget.data_source,
        }
    }
}

fn object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Older layouts store fractional, zoom-divided coordinates.
fn pixel<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() {
        return Err(de::Error::custom("coordinate must be a finite number"));
    }
    Ok(value.max(0.0).round().min(u32::MAX as f64) as u32)
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart(config: Value) -> WidgetInstance {
        let mut widget = WidgetInstance::new(WidgetId::new("viz-1"), WidgetKind::BarChart, Geometry::at(100, 100));
        let Value::Object(map) = config else { panic!("object expected") };
        widget.config = WidgetConfig::from_json(WidgetKind::BarChart, map).unwrap();
        widget
    }

    #[test]
    fn test_kind_parses_canonical_ids_and_aliases() {
        assert_eq!("kpi-card".parse::<WidgetKind>().unwrap(), WidgetKind::KpiCard);
        assert_eq!("kpi".parse::<WidgetKind>().unwrap(), WidgetKind::KpiCard);
        assert_eq!("bar".parse::<WidgetKind>().unwrap(), WidgetKind::BarChart);
        assert_eq!(
            "sparkline".parse::<WidgetKind>(),
            Err(WidgetError::UnknownKind("sparkline".to_string()))
        );
    }

    #[test]
    fn test_config_patch_keeps_unrelated_keys() {
        let mut widget = chart(json!({"color": "#000000", "dataKey": "value"}));
        widget.apply(WidgetPatch::config_key("color", "#ff0000")).unwrap();

        assert_eq!(
            Value::Object(widget.config().to_json()),
            json!({"color": "#ff0000", "dataKey": "value"})
        );
    }

    #[test]
    fn test_invalid_patch_leaves_widget_untouched() {
        let mut widget = WidgetInstance::new(WidgetId::new("viz-1"), WidgetKind::KpiCard, Geometry::at(10, 10));
        let before = widget.clone();

        let mut patch = WidgetPatch::config_key("change", "lots");
        patch.title = Some("Revenue".to_string());
        assert!(matches!(widget.apply(patch), Err(WidgetError::InvalidConfig { .. })));
        assert_eq!(widget, before);

        let mut patch = WidgetPatch::title("Revenue");
        patch.width = Some(10);
        assert!(matches!(widget.apply(patch), Err(WidgetError::TooSmall { dimension: "width", .. })));
        assert_eq!(widget, before);
    }

    #[test]
    fn test_gauge_bounds_are_validated() {
        let mut widget = WidgetInstance::new(WidgetId::new("viz-g"), WidgetKind::Gauge, Geometry::at(0, 0));
        let result = widget.apply(WidgetPatch::config_key("min", 200));
        assert!(matches!(result, Err(WidgetError::InvalidConfig { kind: WidgetKind::Gauge, .. })));
    }

    #[test]
    fn test_style_patch_merges_top_level_keys() {
        let mut widget = chart(json!({"color": "#000000"}));
        widget.apply(WidgetPatch::style_key("gridLines", false)).unwrap();
        let style = widget.style.clone().unwrap();
        assert!(!style.grid_lines);
        assert_eq!(style.legend, LegendStyle::default());

        let result = widget.apply(WidgetPatch::style_key("opacity", 1.5));
        assert!(matches!(result, Err(WidgetError::InvalidStyle(_))));
    }

    #[test]
    fn test_record_accepts_legacy_shapes() {
        let widget: WidgetInstance = serde_json::from_value(json!({
            "id": "1712",
            "type": "kpi",
            "name": "Revenue",
            "x": 120.6,
            "y": -4,
            "width": 300,
            "height": 20,
            "config": {"value": 0, "title": "KPI", "format": "number"},
            "data_source_id": ""
        }))
        .unwrap();

        assert_eq!(widget.kind(), WidgetKind::KpiCard);
        assert_eq!(widget.title, "Revenue");
        assert_eq!(widget.geometry, Geometry::new(121, 0, 300, MIN_WIDGET_SIZE));
        assert_eq!(widget.data_source, None);
        let WidgetConfig::Kpi(kpi) = widget.config() else { panic!("kpi config expected") };
        assert_eq!(kpi.value, "0");
    }

    #[test]
    fn test_record_serializes_flat_geometry() {
        let widget = WidgetInstance::new(WidgetId::new("viz-7"), WidgetKind::TextBox, Geometry::at(50, 60));
        let value = serde_json::to_value(&widget).unwrap();
        assert_eq!(value["type"], "text-box");
        assert_eq!(value["x"], 50);
        assert_eq!(value["height"], DEFAULT_HEIGHT);
        assert_eq!(value["config"]["content"], "Add your text content here");
        assert!(value.get("style").is_none());
    }
}
