// Page- and dashboard-scoped filters. They only hold values; nothing applies them to data yet.
use super::ids::FilterId;
use super::widget::FilterKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterError {
    #[error("filter '{0}' not found")]
    NotFound(FilterId),
    #[error("{expected} filter cannot hold a {actual} value")]
    ValueMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("'{0}' is not one of the dropdown options")]
    UnknownOption(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

/// Input control plus the value it currently holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterControl {
    Dropdown {
        #[serde(default)]
        options: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    DateRange {
        #[serde(default)]
        value: DateRange,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default)]
        value: NumberRange,
    },
}

impl FilterControl {
    pub fn empty(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Dropdown => FilterControl::Dropdown {
                options: vec![
                    "Option 1".to_string(),
                    "Option 2".to_string(),
                    "Option 3".to_string(),
                ],
                value: None,
            },
            FilterKind::Text => FilterControl::Text { value: None },
            FilterKind::DateRange => FilterControl::DateRange {
                value: DateRange::default(),
            },
            FilterKind::Number => FilterControl::Number {
                min: None,
                max: None,
                value: NumberRange::default(),
            },
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            FilterControl::Dropdown { .. } => FilterKind::Dropdown,
            FilterControl::Text { .. } => FilterKind::Text,
            FilterControl::DateRange { .. } => FilterKind::DateRange,
            FilterControl::Number { .. } => FilterKind::Number,
        }
    }
}

/// A value to store into a filter; must match the filter's control.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Option(Option<String>),
    Text(String),
    DateRange(DateRange),
    Number(NumberRange),
}

impl FilterValue {
    fn label(&self) -> &'static str {
        match self {
            FilterValue::Option(_) => "dropdown",
            FilterValue::Text(_) => "text",
            FilterValue::DateRange(_) => "dateRange",
            FilterValue::Number(_) => "number",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: FilterId,
    pub label: String,
    #[serde(default)]
    pub field: String,
    #[serde(flatten)]
    pub control: FilterControl,
}

impl Filter {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            id: FilterId::generate(),
            label: format!("New {} Filter", kind.as_str()),
            field: String::new(),
            control: FilterControl::empty(kind),
        }
    }

    pub fn set_value(&mut self, value: FilterValue) -> Result<(), FilterError> {
        let expected = self.control.kind().as_str();
        match (&mut self.control, value) {
            (FilterControl::Dropdown { options, value }, FilterValue::Option(selected)) => {
                if let Some(choice) = &selected {
                    if !options.contains(choice) {
                        return Err(FilterError::UnknownOption(choice.clone()));
                    }
                }
                *value = selected;
            }
            (FilterControl::Text { value }, FilterValue::Text(text)) => {
                *value = (!text.is_empty()).then_some(text);
            }
            (FilterControl::DateRange { value }, FilterValue::DateRange(range)) => *value = range,
            (FilterControl::Number { value, .. }, FilterValue::Number(range)) => *value = range,
            (_, other) => {
                return Err(FilterError::ValueMismatch {
                    expected,
                    actual: other.label(),
                });
            }
        }
        Ok(())
    }

    pub fn clear_value(&mut self) {
        match &mut self.control {
            FilterControl::Dropdown { value, .. } | FilterControl::Text { value } => *value = None,
            FilterControl::DateRange { value } => *value = DateRange::default(),
            FilterControl::Number { value, .. } => *value = NumberRange::default(),
        }
    }
}

/// Filters owned by one page or by the whole dashboard.
pub trait FilterSet {
    fn filters(&self) -> &[Filter];
    fn filters_mut(&mut self) -> &mut Vec<Filter>;

    fn add_filter(&mut self, kind: FilterKind) -> FilterId {
        let filter = Filter::new(kind);
        let id = filter.id.clone();
        self.filters_mut().push(filter);
        id
    }

    fn filter_mut(&mut self, id: &FilterId) -> Result<&mut Filter, FilterError> {
        self.filters_mut()
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| FilterError::NotFound(id.clone()))
    }

    fn remove_filter(&mut self, id: &FilterId) -> Result<Filter, FilterError> {
        let filters = self.filters_mut();
        let index = filters
            .iter()
            .position(|f| &f.id == id)
            .ok_or_else(|| FilterError::NotFound(id.clone()))?;
        Ok(filters.remove(index))
    }

    fn clear_filter_values(&mut self) {
        for filter in self.filters_mut() {
            filter.clear_value();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_dropdown_has_placeholder_options() {
        let filter = Filter::new(FilterKind::Dropdown);
        assert_eq!(filter.label, "New dropdown Filter");
        let FilterControl::Dropdown { options, value } = &filter.control else {
            panic!("dropdown expected")
        };
        assert_eq!(options.len(), 3);
        assert_eq!(value, &None);
    }

    #[test]
    fn test_set_value_checks_control_type() {
        let mut filter = Filter::new(FilterKind::Number);
        let result = filter.set_value(FilterValue::Text("abc".to_string()));
        assert_eq!(
            result,
            Err(FilterError::ValueMismatch {
                expected: "number",
                actual: "text"
            })
        );

        filter
            .set_value(FilterValue::Number(NumberRange {
                min: Some(1.0),
                max: None,
            }))
            .unwrap();
        filter.clear_value();
        assert_eq!(
            filter.control,
            FilterControl::Number {
                min: None,
                max: None,
                value: NumberRange::default()
            }
        );
    }

    #[test]
    fn test_dropdown_rejects_unknown_option() {
        let mut filter = Filter::new(FilterKind::Dropdown);
        assert!(filter.set_value(FilterValue::Option(Some("Option 2".to_string()))).is_ok());
        assert_eq!(
            filter.set_value(FilterValue::Option(Some("Option 9".to_string()))),
            Err(FilterError::UnknownOption("Option 9".to_string()))
        );
    }

    #[test]
    fn test_filter_json_shape() {
        let filter: Filter = serde_json::from_value(json!({
            "id": "filter-1",
            "type": "dateRange",
            "label": "Period",
            "field": "created_at",
            "value": {"from": "2024-01-01T00:00:00.000Z"}
        }))
        .unwrap();
        assert_eq!(filter.control.kind(), FilterKind::DateRange);

        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value["type"], "dateRange");
        assert_eq!(value["field"], "created_at");
        assert!(value["value"].get("to").is_none());
    }
}
