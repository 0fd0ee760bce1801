// Widget registry - static catalog of placeable widget types
use super::widget::{WidgetConfig, WidgetKind};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Charts,
    Kpi,
    Data,
    Content,
    Interactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetType {
    pub id: WidgetKind,
    pub name: &'static str,
    pub icon: &'static str,
    pub category: Category,
}

const fn entry_for(id: WidgetKind, name: &'static str, icon: &'static str, category: Category) -> WidgetType {
    WidgetType {
        id,
        name,
        icon,
        category,
    }
}

static CATALOG: [WidgetType; 13] = [
    entry_for(WidgetKind::BarChart, "Bar Chart", "bar-chart-3", Category::Charts),
    entry_for(WidgetKind::LineChart, "Line Chart", "line-chart", Category::Charts),
    entry_for(WidgetKind::AreaChart, "Area Chart", "activity", Category::Charts),
    entry_for(WidgetKind::PieChart, "Pie Chart", "pie-chart", Category::Charts),
    entry_for(WidgetKind::ScatterPlot, "Scatter Plot", "grid-3x3", Category::Charts),
    entry_for(WidgetKind::KpiCard, "KPI Card", "hash", Category::Kpi),
    entry_for(WidgetKind::Metric, "Metric", "trending-up", Category::Kpi),
    entry_for(WidgetKind::Gauge, "Gauge", "gauge", Category::Kpi),
    entry_for(WidgetKind::Table, "Table", "table", Category::Data),
    entry_for(WidgetKind::TextBox, "Text Box", "type", Category::Content),
    entry_for(WidgetKind::Image, "Image", "image", Category::Content),
    entry_for(WidgetKind::Filter, "Filter", "filter", Category::Interactive),
    entry_for(WidgetKind::Button, "Action Button", "zap", Category::Interactive),
];

/// Every placeable widget type, in palette order.
pub fn list_types() -> &'static [WidgetType] {
    &CATALOG
}

pub fn entry(kind: WidgetKind) -> &'static WidgetType {
    CATALOG
        .iter()
        .find(|t| t.id == kind)
        .unwrap_or(&CATALOG[0])
}

/// Default config for a type id. Unrecognized ids get an empty map.
pub fn default_config(type_id: &str) -> Map<String, Value> {
    match type_id.parse::<WidgetKind>() {
        Ok(kind) => WidgetConfig::default_for(kind).to_json(),
        Err(_) => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_covers_every_kind_once() {
        for kind in WidgetKind::ALL {
            assert_eq!(list_types().iter().filter(|t| t.id == kind).count(), 1, "{kind}");
            assert_eq!(entry(kind).id, kind);
        }
    }

    #[test]
    fn test_default_configs() {
        assert_eq!(
            Value::Object(default_config("kpi-card")),
            json!({"value": "12,345", "change": 12.5, "changeType": "increase"})
        );
        assert_eq!(
            Value::Object(default_config("gauge")),
            json!({"value": 75.0, "min": 0.0, "max": 100.0, "color": "hsl(var(--primary))"})
        );
        assert_eq!(
            Value::Object(default_config("pie-chart")),
            json!({"color": "hsl(var(--primary))", "dataKey": "value", "nameKey": "name"})
        );
        assert_eq!(default_config("table")["pageSize"], 10);
    }

    #[test]
    fn test_unknown_type_has_empty_default() {
        assert!(default_config("hologram").is_empty());
    }

    #[test]
    fn test_listing_serializes_type_ids() {
        let value = serde_json::to_value(list_types()).unwrap();
        assert_eq!(value[5]["id"], "kpi-card");
        assert_eq!(value[5]["category"], "kpi");
    }
}
