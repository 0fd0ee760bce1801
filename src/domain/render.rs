// Rendering adapter - turns widgets into a render tree for the charting front end
use super::data_source::DataSource;
use super::ids::{DataSourceId, PageId, WidgetId};
use super::page::Page;
use super::widget::{
    ButtonConfig, FilterWidgetConfig, GaugeConfig, Geometry, ImageConfig, KpiConfig, TextConfig, WidgetConfig,
    WidgetInstance, WidgetKind, WidgetStyle, PRIMARY_COLOR,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

impl DataPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Area,
    Pie,
    Scatter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub chart: ChartKind,
    pub color: String,
    pub points: Vec<DataPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<WidgetStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Static widgets render their config as-is; charts and tables carry data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderNode {
    Chart(ChartData),
    Kpi(KpiConfig),
    Gauge(GaugeConfig),
    Table(TableData),
    Text(TextConfig),
    Image(ImageConfig),
    Filter(FilterWidgetConfig),
    Button(ButtonConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedWidget {
    pub id: WidgetId,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub title: String,
    #[serde(flatten)]
    pub geometry: Geometry,
    /// True when the widget has no usable data source and shows sample data.
    pub sample: bool,
    pub node: RenderNode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPage {
    pub id: PageId,
    pub name: String,
    pub slug: String,
    pub widgets: Vec<RenderedWidget>,
}

/// Render one widget. `rows` are the records of its data source, if it has one.
pub fn render_widget(widget: &WidgetInstance, rows: Option<&[Row]>) -> RenderedWidget {
    let rows = rows.filter(|r| !r.is_empty());
    let node = match widget.config() {
        WidgetConfig::Chart(config) => {
            let label_key = config
                .x_axis_key
                .as_deref()
                .or(config.name_key.as_deref())
                .unwrap_or("name");
            let value_key = config.data_key.as_deref().unwrap_or("value");
            let points = match rows {
                Some(rows) => extract_points(rows, label_key, value_key),
                None => sample_points(widget.kind()),
            };
            RenderNode::Chart(ChartData {
                chart: chart_kind(widget.kind()),
                color: config.color.clone().unwrap_or_else(|| PRIMARY_COLOR.to_string()),
                points,
                style: widget.style.clone(),
            })
        }
        WidgetConfig::Kpi(config) => RenderNode::Kpi(config.clone()),
        WidgetConfig::Gauge(config) => RenderNode::Gauge(GaugeConfig {
            value: config.value.clamp(config.min, config.max),
            color: Some(config.color.clone().unwrap_or_else(|| PRIMARY_COLOR.to_string())),
            ..config.clone()
        }),
        WidgetConfig::Table(config) => {
            let source: Vec<Row> = match rows {
                Some(rows) => rows.to_vec(),
                None => sample_points(WidgetKind::BarChart)
                    .into_iter()
                    .map(|p| {
                        let mut row = Row::new();
                        row.insert("name".to_string(), Value::from(p.label));
                        row.insert("value".to_string(), Value::from(p.value));
                        row
                    })
                    .collect(),
            };
            RenderNode::Table(TableData {
                columns: config.columns.clone(),
                rows: source
                    .iter()
                    .take(config.page_size as usize)
                    .map(|row| config.columns.iter().map(|c| cell(row.get(c))).collect())
                    .collect(),
            })
        }
        WidgetConfig::Text(config) => RenderNode::Text(config.clone()),
        WidgetConfig::Image(config) => RenderNode::Image(config.clone()),
        WidgetConfig::Filter(config) => RenderNode::Filter(config.clone()),
        WidgetConfig::Button(config) => RenderNode::Button(config.clone()),
    };

    RenderedWidget {
        id: widget.id().clone(),
        kind: widget.kind(),
        title: widget.title.clone(),
        geometry: widget.geometry,
        sample: rows.is_none(),
        node,
    }
}

/// Render every widget of a page, resolving data sources by id.
pub fn render_page(page: &Page, sources: &HashMap<DataSourceId, DataSource>) -> RenderedPage {
    let widgets = page
        .widgets
        .iter()
        .map(|widget| {
            let rows = widget
                .data_source
                .as_ref()
                .and_then(|id| sources.get(id))
                .map(DataSource::rows);
            render_widget(widget, rows.as_deref())
        })
        .collect();

    RenderedPage {
        id: page.id.clone(),
        name: page.name.clone(),
        slug: page.slug.clone(),
        widgets,
    }
}

fn chart_kind(kind: WidgetKind) -> ChartKind {
    match kind {
        WidgetKind::LineChart => ChartKind::Line,
        WidgetKind::AreaChart => ChartKind::Area,
        WidgetKind::PieChart => ChartKind::Pie,
        WidgetKind::ScatterPlot => ChartKind::Scatter,
        _ => ChartKind::Bar,
    }
}

fn sample_points(kind: WidgetKind) -> Vec<DataPoint> {
    match kind {
        WidgetKind::PieChart => vec![
            DataPoint::new("Desktop", 400.0),
            DataPoint::new("Mobile", 300.0),
            DataPoint::new("Tablet", 200.0),
        ],
        _ => vec![
            DataPoint::new("Jan", 400.0),
            DataPoint::new("Feb", 300.0),
            DataPoint::new("Mar", 600.0),
            DataPoint::new("Apr", 800.0),
            DataPoint::new("May", 500.0),
            DataPoint::new("Jun", 700.0),
        ],
    }
}

/// Uploaded CSV rows hold strings, so numeric strings count as values.
fn extract_points(rows: &[Row], label_key: &str, value_key: &str) -> Vec<DataPoint> {
    rows.iter()
        .filter_map(|row| {
            let value = match row.get(value_key)? {
                Value::Number(n) => n.as_f64()?,
                Value::String(s) => s.trim().parse::<f64>().ok()?,
                _ => return None,
            };
            Some(DataPoint::new(cell(row.get(label_key)), value))
        })
        .collect()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
