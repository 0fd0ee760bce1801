// Page model - one named canvas of widgets
use super::filter::{Filter, FilterSet};
use super::ids::{PageId, WidgetId};
use super::widget::WidgetInstance;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "visualizations", default)]
    pub widgets: Vec<WidgetInstance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
}

impl Page {
    pub fn new(id: PageId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            slug: slugify(&name),
            name,
            widgets: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.slug = slugify(&self.name);
    }

    pub fn widget(&self, id: &WidgetId) -> Option<&WidgetInstance> {
        self.widgets.iter().find(|w| w.id() == id)
    }

    pub fn widget_mut(&mut self, id: &WidgetId) -> Option<&mut WidgetInstance> {
        self.widgets.iter_mut().find(|w| w.id() == id)
    }

    /// First widget id that occurs more than once, if any.
    pub fn duplicate_widget_id(&self) -> Option<&WidgetId> {
        self.widgets
            .iter()
            .enumerate()
            .find(|(i, w)| self.widgets[..*i].iter().any(|other| other.id() == w.id()))
            .map(|(_, w)| w.id())
    }
}

impl FilterSet for Page {
    fn filters(&self) -> &[Filter] {
        &self.filters
    }

    fn filters_mut(&mut self) -> &mut Vec<Filter> {
        &mut self.filters
    }
}

/// URL-safe form of a page name: "Sales Q1 / EU" -> "sales-q1-eu".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("page");
    }
    slug
}
