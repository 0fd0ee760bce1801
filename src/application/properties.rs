// Properties panel - per-kind field lists and typed single-field edits
use crate::domain::dashboard::{Dashboard, DocumentError};
use crate::domain::ids::{DataSourceId, PageId, WidgetId};
use crate::domain::widget::{WidgetInstance, WidgetKind, WidgetPatch};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("{field}: expected {expected}, got '{input}'")]
    Malformed {
        field: &'static str,
        expected: &'static str,
        input: String,
    },
    #[error("{field}: '{input}' is not one of {options:?}")]
    NotAnOption {
        field: &'static str,
        input: String,
        options: &'static [&'static str],
    },
    #[error("{field} is not a property of {kind} widgets")]
    NotApplicable { field: &'static str, kind: WidgetKind },
    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleField {
    GridLines,
    ShowLegend,
    LegendPosition,
    TitleFontSize,
    Opacity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Title,
    DataSource,
    X,
    Y,
    Width,
    Height,
    /// A key of the widget's `config` object.
    Config(&'static str),
    Style(StyleField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldInput {
    Text,
    Multiline,
    Integer,
    Number,
    Color,
    Select(&'static [&'static str]),
    /// Comma separated values.
    List,
    Toggle,
    DataSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub label: &'static str,
    pub input: FieldInput,
}

const fn field(key: FieldKey, label: &'static str, input: FieldInput) -> FieldSpec {
    FieldSpec { key, label, input }
}

const CHANGE_TYPES: &[&str] = &["increase", "decrease"];
const FILTER_TYPES: &[&str] = &["dropdown", "text", "dateRange", "number"];
const LEGEND_POSITIONS: &[&str] = &["top", "bottom", "left", "right"];

const COMMON: [FieldSpec; 6] = [
    field(FieldKey::Title, "Title", FieldInput::Text),
    field(FieldKey::DataSource, "Data Source", FieldInput::DataSource),
    field(FieldKey::X, "X", FieldInput::Integer),
    field(FieldKey::Y, "Y", FieldInput::Integer),
    field(FieldKey::Width, "Width", FieldInput::Integer),
    field(FieldKey::Height, "Height", FieldInput::Integer),
];

const CHART_STYLE: [FieldSpec; 5] = [
    field(FieldKey::Style(StyleField::GridLines), "Grid Lines", FieldInput::Toggle),
    field(FieldKey::Style(StyleField::ShowLegend), "Show Legend", FieldInput::Toggle),
    field(
        FieldKey::Style(StyleField::LegendPosition),
        "Legend Position",
        FieldInput::Select(LEGEND_POSITIONS),
    ),
    field(FieldKey::Style(StyleField::TitleFontSize), "Title Font Size", FieldInput::Integer),
    field(FieldKey::Style(StyleField::Opacity), "Opacity", FieldInput::Number),
];

/// Ordered fields shown for a widget kind: common fields first.
pub fn fields_for(kind: WidgetKind) -> Vec<FieldSpec> {
    let mut fields = COMMON.to_vec();
    match kind {
        WidgetKind::KpiCard | WidgetKind::Metric => fields.extend([
            field(FieldKey::Config("value"), "Value", FieldInput::Text),
            field(FieldKey::Config("change"), "Change (%)", FieldInput::Number),
            field(FieldKey::Config("changeType"), "Change Type", FieldInput::Select(CHANGE_TYPES)),
        ]),
        WidgetKind::TextBox => fields.extend([
            field(FieldKey::Config("content"), "Content", FieldInput::Multiline),
            field(FieldKey::Config("fontSize"), "Font Size", FieldInput::Integer),
        ]),
        WidgetKind::PieChart => {
            fields.extend([
                field(FieldKey::Config("color"), "Color", FieldInput::Color),
                field(FieldKey::Config("dataKey"), "Data Key", FieldInput::Text),
                field(FieldKey::Config("nameKey"), "Name Key", FieldInput::Text),
            ]);
            fields.extend(CHART_STYLE);
        }
        WidgetKind::BarChart | WidgetKind::LineChart | WidgetKind::AreaChart | WidgetKind::ScatterPlot => {
            fields.extend([
                field(FieldKey::Config("color"), "Color", FieldInput::Color),
                field(FieldKey::Config("dataKey"), "Data Key", FieldInput::Text),
                field(FieldKey::Config("xAxisKey"), "X Axis Key", FieldInput::Text),
            ]);
            fields.extend(CHART_STYLE);
        }
        WidgetKind::Gauge => fields.extend([
            field(FieldKey::Config("color"), "Color", FieldInput::Color),
            field(FieldKey::Config("value"), "Value", FieldInput::Number),
            field(FieldKey::Config("min"), "Min", FieldInput::Number),
            field(FieldKey::Config("max"), "Max", FieldInput::Number),
        ]),
        WidgetKind::Table => fields.extend([
            field(FieldKey::Config("columns"), "Columns", FieldInput::List),
            field(FieldKey::Config("pageSize"), "Page Size", FieldInput::Integer),
        ]),
        WidgetKind::Image => fields.extend([
            field(FieldKey::Config("src"), "Image URL", FieldInput::Text),
            field(FieldKey::Config("alt"), "Alt Text", FieldInput::Text),
        ]),
        WidgetKind::Filter => fields.extend([
            field(FieldKey::Config("type"), "Filter Type", FieldInput::Select(FILTER_TYPES)),
            field(FieldKey::Config("options"), "Options", FieldInput::List),
        ]),
        WidgetKind::Button => fields.extend([
            field(FieldKey::Config("label"), "Label", FieldInput::Text),
            field(FieldKey::Config("action"), "Action", FieldInput::Text),
        ]),
    }
    fields
}

/// Current value of a field, formatted for an input box.
pub fn field_value(widget: &WidgetInstance, key: FieldKey) -> String {
    let style = || widget.style.clone().unwrap_or_default();
    match key {
        FieldKey::Title => widget.title.clone(),
        FieldKey::DataSource => widget.data_source.as_ref().map(|id| id.to_string()).unwrap_or_default(),
        FieldKey::X => widget.geometry.x.to_string(),
        FieldKey::Y => widget.geometry.y.to_string(),
        FieldKey::Width => widget.geometry.width.to_string(),
        FieldKey::Height => widget.geometry.height.to_string(),
        FieldKey::Config(name) => match widget.config().to_json().get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
            Some(other) => other.to_string(),
        },
        FieldKey::Style(StyleField::GridLines) => style().grid_lines.to_string(),
        FieldKey::Style(StyleField::ShowLegend) => style().legend.show.to_string(),
        FieldKey::Style(StyleField::LegendPosition) => {
            serde_json::to_value(style().legend.position)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        }
        FieldKey::Style(StyleField::TitleFontSize) => style().title.font_size.to_string(),
        FieldKey::Style(StyleField::Opacity) => style().opacity.to_string(),
    }
}

/// Parse `raw` for one field and apply it as a single-key patch. Nothing
/// changes when the input is rejected.
pub fn apply_field(
    doc: &mut Dashboard,
    page: &PageId,
    widget: &WidgetId,
    key: FieldKey,
    raw: &str,
) -> Result<(), FieldError> {
    let current = doc.widget(page, widget)?;
    let kind = current.kind();
    let spec = fields_for(kind)
        .into_iter()
        .find(|spec| spec.key == key)
        .ok_or(FieldError::NotApplicable {
            field: key_name(key),
            kind,
        })?;
    let value = parse_input(spec, raw)?;
    let patch = build_patch(current, key, value)?;
    doc.update_widget(page, widget, patch)?;
    Ok(())
}

fn key_name(key: FieldKey) -> &'static str {
    match key {
        FieldKey::Title => "title",
        FieldKey::DataSource => "dataSource",
        FieldKey::X => "x",
        FieldKey::Y => "y",
        FieldKey::Width => "width",
        FieldKey::Height => "height",
        FieldKey::Config(name) => name,
        FieldKey::Style(StyleField::GridLines) => "gridLines",
        FieldKey::Style(StyleField::ShowLegend) => "legend.show",
        FieldKey::Style(StyleField::LegendPosition) => "legend.position",
        FieldKey::Style(StyleField::TitleFontSize) => "title.fontSize",
        FieldKey::Style(StyleField::Opacity) => "opacity",
    }
}

fn parse_input(spec: FieldSpec, raw: &str) -> Result<Value, FieldError> {
    let name = key_name(spec.key);
    let malformed = |expected: &'static str| FieldError::Malformed {
        field: name,
        expected,
        input: raw.to_string(),
    };
    let trimmed = raw.trim();
    match spec.input {
        FieldInput::Text | FieldInput::Multiline => Ok(Value::String(raw.to_string())),
        FieldInput::Color => {
            if trimmed.is_empty() {
                return Err(malformed("a color"));
            }
            Ok(Value::String(trimmed.to_string()))
        }
        FieldInput::Integer => trimmed
            .parse::<u32>()
            .map(Value::from)
            .map_err(|_| malformed("a whole number")),
        FieldInput::Number => match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::from(n)),
            _ => Err(malformed("a number")),
        },
        FieldInput::Select(options) => {
            if options.contains(&trimmed) {
                Ok(Value::String(trimmed.to_string()))
            } else {
                Err(FieldError::NotAnOption {
                    field: name,
                    input: raw.to_string(),
                    options,
                })
            }
        }
        FieldInput::List => Ok(Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
        FieldInput::Toggle => match trimmed {
            "true" | "on" => Ok(Value::Bool(true)),
            "false" | "off" => Ok(Value::Bool(false)),
            _ => Err(malformed("true or false")),
        },
        FieldInput::DataSource => Ok(Value::String(trimmed.to_string())),
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

fn build_patch(widget: &WidgetInstance, key: FieldKey, value: Value) -> Result<WidgetPatch, FieldError> {
    let name = key_name(key);
    let style = || widget.style.clone().unwrap_or_default();
    let encode = |v: Result<Value, serde_json::Error>| {
        v.map_err(|e| FieldError::Malformed {
            field: name,
            expected: "a style value",
            input: e.to_string(),
        })
    };

    let patch = match key {
        FieldKey::Title => WidgetPatch::title(value.as_str().unwrap_or_default()),
        FieldKey::DataSource => {
            let source = value.as_str().filter(|s| !s.is_empty()).map(DataSourceId::new);
            WidgetPatch::data_source(source)
        }
        FieldKey::X => WidgetPatch {
            x: as_u32(&value),
            ..WidgetPatch::default()
        },
        FieldKey::Y => WidgetPatch {
            y: as_u32(&value),
            ..WidgetPatch::default()
        },
        FieldKey::Width => WidgetPatch {
            width: as_u32(&value),
            ..WidgetPatch::default()
        },
        FieldKey::Height => WidgetPatch {
            height: as_u32(&value),
            ..WidgetPatch::default()
        },
        FieldKey::Config(name) => WidgetPatch::config_key(name, value),
        FieldKey::Style(StyleField::GridLines) => WidgetPatch::style_key("gridLines", value),
        FieldKey::Style(StyleField::Opacity) => WidgetPatch::style_key("opacity", value),
        FieldKey::Style(StyleField::ShowLegend) => {
            let mut legend = style().legend;
            legend.show = value.as_bool().unwrap_or(legend.show);
            WidgetPatch::style_key("legend", encode(serde_json::to_value(legend))?)
        }
        FieldKey::Style(StyleField::LegendPosition) => {
            let mut legend = serde_json::to_value(style().legend).unwrap_or(Value::Null);
            legend["position"] = value;
            WidgetPatch::style_key("legend", legend)
        }
        FieldKey::Style(StyleField::TitleFontSize) => {
            let mut title = style().title;
            title.font_size = as_u32(&value).unwrap_or(title.font_size);
            WidgetPatch::style_key("title", encode(serde_json::to_value(title))?)
        }
    };
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::widget::{FilterKind, LegendPosition, WidgetConfig, WidgetError, WidgetStyle};

    fn setup(kind: WidgetKind) -> (Dashboard, PageId, WidgetId) {
        let mut doc = Dashboard::new("Panel");
        let page = doc.pages()[0].id.clone();
        let id = doc.add_widget(&page, kind, None).unwrap().id().clone();
        (doc, page, id)
    }

    #[test]
    fn test_fields_for_kinds() {
        let keys = |kind| fields_for(kind).into_iter().map(|f| f.key).collect::<Vec<_>>();

        let kpi = keys(WidgetKind::KpiCard);
        assert_eq!(&kpi[..6], COMMON.map(|f| f.key).as_slice());
        assert_eq!(
            &kpi[6..],
            [FieldKey::Config("value"), FieldKey::Config("change"), FieldKey::Config("changeType")]
        );
        assert!(keys(WidgetKind::PieChart).contains(&FieldKey::Config("nameKey")));
        assert!(!keys(WidgetKind::PieChart).contains(&FieldKey::Config("xAxisKey")));
        assert!(keys(WidgetKind::LineChart).contains(&FieldKey::Style(StyleField::Opacity)));
        assert!(!keys(WidgetKind::Gauge).contains(&FieldKey::Style(StyleField::Opacity)));
    }

    #[test]
    fn test_numeric_field_is_typed() {
        let (mut doc, page, id) = setup(WidgetKind::KpiCard);
        apply_field(&mut doc, &page, &id, FieldKey::Config("change"), "-3.5").unwrap();
        let WidgetConfig::Kpi(kpi) = doc.widget(&page, &id).unwrap().config() else { panic!("kpi expected") };
        assert_eq!(kpi.change, -3.5);

        let before = doc.clone();
        let err = apply_field(&mut doc, &page, &id, FieldKey::Config("change"), "a lot").unwrap_err();
        assert!(matches!(err, FieldError::Malformed { field: "change", .. }));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_out_of_range_geometry_is_rejected() {
        let (mut doc, page, id) = setup(WidgetKind::Table);
        let err = apply_field(&mut doc, &page, &id, FieldKey::Width, "20").unwrap_err();
        assert!(matches!(
            err,
            FieldError::Document(DocumentError::Widget(WidgetError::TooSmall { .. }))
        ));
        assert!(matches!(
            apply_field(&mut doc, &page, &id, FieldKey::X, "-5"),
            Err(FieldError::Malformed { .. })
        ));
        apply_field(&mut doc, &page, &id, FieldKey::Width, "420").unwrap();
        assert_eq!(field_value(doc.widget(&page, &id).unwrap(), FieldKey::Width), "420");
    }

    #[test]
    fn test_select_and_list_fields() {
        let (mut doc, page, id) = setup(WidgetKind::Filter);
        assert!(matches!(
            apply_field(&mut doc, &page, &id, FieldKey::Config("type"), "slider"),
            Err(FieldError::NotAnOption { .. })
        ));
        apply_field(&mut doc, &page, &id, FieldKey::Config("type"), "dateRange").unwrap();
        apply_field(&mut doc, &page, &id, FieldKey::Config("options"), "North, South,, East ").unwrap();

        let widget = doc.widget(&page, &id).unwrap();
        assert_eq!(field_value(widget, FieldKey::Config("options")), "North, South, East");
        let WidgetConfig::Filter(filter) = widget.config() else { panic!("filter expected") };
        assert_eq!(filter.control, FilterKind::DateRange);
    }

    #[test]
    fn test_field_not_applicable() {
        let (mut doc, page, id) = setup(WidgetKind::TextBox);
        assert_eq!(
            apply_field(&mut doc, &page, &id, FieldKey::Config("dataKey"), "value"),
            Err(FieldError::NotApplicable {
                field: "dataKey",
                kind: WidgetKind::TextBox
            })
        );
    }

    #[test]
    fn test_chart_style_fields_edit_nested_values() {
        let (mut doc, page, id) = setup(WidgetKind::AreaChart);
        apply_field(&mut doc, &page, &id, FieldKey::Style(StyleField::LegendPosition), "right").unwrap();
        apply_field(&mut doc, &page, &id, FieldKey::Style(StyleField::ShowLegend), "false").unwrap();
        apply_field(&mut doc, &page, &id, FieldKey::Style(StyleField::TitleFontSize), "22").unwrap();

        let style = doc.widget(&page, &id).unwrap().style.clone().unwrap();
        assert_eq!(style.legend.position, LegendPosition::Right);
        assert!(!style.legend.show);
        assert_eq!(style.title.font_size, 22);
        assert_eq!(style.colors, WidgetStyle::default().colors);

        assert!(matches!(
            apply_field(&mut doc, &page, &id, FieldKey::Style(StyleField::Opacity), "1.4"),
            Err(FieldError::Document(DocumentError::Widget(WidgetError::InvalidStyle(_))))
        ));
    }

    #[test]
    fn test_data_source_field() {
        let (mut doc, page, id) = setup(WidgetKind::BarChart);
        apply_field(&mut doc, &page, &id, FieldKey::DataSource, "source-9").unwrap();
        assert_eq!(
            doc.widget(&page, &id).unwrap().data_source,
            Some(DataSourceId::new("source-9"))
        );
        apply_field(&mut doc, &page, &id, FieldKey::DataSource, "").unwrap();
        assert_eq!(doc.widget(&page, &id).unwrap().data_source, None);
    }
}
