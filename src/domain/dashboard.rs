// Dashboard document - metadata, pages and settings that round-trip to storage
use super::filter::{Filter, FilterError, FilterSet};
use super::ids::{DashboardId, PageId, UserId, WidgetId};
use super::page::{slugify, Page};
use super::share::ShareSettings;
use super::widget::{Geometry, WidgetError, WidgetInstance, WidgetKind, WidgetPatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Where `add_widget` places a widget when no drop position is given.
pub const DEFAULT_POSITION: (u32, u32) = (50, 50);
/// Shift applied to a duplicated widget so the copy does not hide the source.
pub const DUPLICATE_OFFSET: u32 = 20;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DocumentError {
    #[error("page '{0}' not found")]
    PageNotFound(PageId),
    #[error("page index {0} is out of range")]
    PageIndexOutOfRange(usize),
    #[error("widget '{0}' not found")]
    WidgetNotFound(WidgetId),
    #[error("cannot delete the last page")]
    LastPage,
    #[error(transparent)]
    Widget(#[from] WidgetError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("malformed layout: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("page '{0}' appears more than once")]
    DuplicatePage(PageId),
    #[error("widget '{widget}' appears more than once on page '{page}'")]
    DuplicateWidget { page: PageId, widget: WidgetId },
}

/// Classification tag only; nothing branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DashboardKind {
    Sales,
    Service,
    Admin,
    Business,
    #[default]
    Custom,
}

impl From<String> for DashboardKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "sales" => DashboardKind::Sales,
            "service" => DashboardKind::Service,
            "admin" => DashboardKind::Admin,
            "business" => DashboardKind::Business,
            _ => DashboardKind::Custom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

/// Canvas zoom in percent: 25..=200 in steps of 25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct Zoom(u16);

impl Zoom {
    pub const MIN: u16 = 25;
    pub const MAX: u16 = 200;
    pub const STEP: u16 = 25;

    /// Clamps into range and snaps to the nearest step.
    pub fn new(percent: u16) -> Self {
        let clamped = percent.clamp(Self::MIN, Self::MAX);
        let snapped = (clamped + Self::STEP / 2) / Self::STEP * Self::STEP;
        Self(snapped.clamp(Self::MIN, Self::MAX))
    }

    pub fn percent(self) -> u16 {
        self.0
    }

    /// Factor applied to the canvas container (`percent / 100`).
    pub fn scale(self) -> f64 {
        f64::from(self.0) / 100.0
    }

    pub fn zoom_in(self) -> Self {
        Self::new(self.0.saturating_add(Self::STEP))
    }

    pub fn zoom_out(self) -> Self {
        Self::new(self.0.saturating_sub(Self::STEP))
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(100)
    }
}

impl From<u16> for Zoom {
    fn from(value: u16) -> Self {
        Zoom::new(value)
    }
}

impl From<Zoom> for u16 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasSettings {
    pub view_mode: ViewMode,
    pub zoom: Zoom,
}

/// The JSON stored in the `layout` column of a dashboard row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardLayout {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub settings: CanvasSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_settings: Option<ShareSettings>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl DashboardLayout {
    /// Parse and check a stored layout. A layout without pages gets the default page.
    pub fn parse(value: serde_json::Value) -> Result<Self, LayoutError> {
        let mut layout: DashboardLayout = if value.is_null() {
            DashboardLayout::default()
        } else {
            serde_json::from_value(value)?
        };

        for page in &mut layout.pages {
            if page.slug.is_empty() {
                page.slug = slugify(&page.name);
            }
        }

        let mut page_ids = HashSet::new();
        for page in &layout.pages {
            if !page_ids.insert(&page.id) {
                return Err(LayoutError::DuplicatePage(page.id.clone()));
            }
            if let Some(widget) = page.duplicate_widget_id() {
                return Err(LayoutError::DuplicateWidget {
                    page: page.id.clone(),
                    widget: widget.clone(),
                });
            }
        }

        if layout.pages.is_empty() {
            layout.pages.push(default_page());
        }
        Ok(layout)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DashboardId>,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: DashboardKind,
    pub is_public: bool,
    pages: Vec<Page>,
    pub settings: CanvasSettings,
    pub share_settings: ShareSettings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new("New Dashboard")
    }
}

impl Dashboard {
    /// Unsaved dashboard with a single empty "Page 1".
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            kind: DashboardKind::default(),
            is_public: false,
            pages: vec![default_page()],
            settings: CanvasSettings::default(),
            share_settings: ShareSettings::default(),
            filters: Vec::new(),
            theme: None,
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, id: &PageId) -> Result<&Page, DocumentError> {
        self.pages
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| DocumentError::PageNotFound(id.clone()))
    }

    pub fn page_mut(&mut self, id: &PageId) -> Result<&mut Page, DocumentError> {
        self.pages
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| DocumentError::PageNotFound(id.clone()))
    }

    pub fn page_at(&self, index: usize) -> Result<&Page, DocumentError> {
        self.pages
            .get(index)
            .ok_or(DocumentError::PageIndexOutOfRange(index))
    }

    pub fn widget(&self, page: &PageId, widget: &WidgetId) -> Result<&WidgetInstance, DocumentError> {
        self.page(page)?
            .widget(widget)
            .ok_or_else(|| DocumentError::WidgetNotFound(widget.clone()))
    }

    fn widget_mut(&mut self, page: &PageId, widget: &WidgetId) -> Result<&mut WidgetInstance, DocumentError> {
        self.page_mut(page)?
            .widget_mut(widget)
            .ok_or_else(|| DocumentError::WidgetNotFound(widget.clone()))
    }

    pub fn contains_widget(&self, id: &WidgetId) -> bool {
        self.pages.iter().any(|p| p.widget(id).is_some())
    }

    pub fn widget_count(&self) -> usize {
        self.pages.iter().map(|p| p.widgets.len()).sum()
    }

    /// Random id that no page of this document uses yet.
    fn fresh_widget_id(&self) -> WidgetId {
        loop {
            let id = WidgetId::generate();
            if !self.contains_widget(&id) {
                return id;
            }
        }
    }

    pub fn add_widget(
        &mut self,
        page: &PageId,
        kind: WidgetKind,
        position: Option<(u32, u32)>,
    ) -> Result<&WidgetInstance, DocumentError> {
        let id = self.fresh_widget_id();
        let (x, y) = position.unwrap_or(DEFAULT_POSITION);
        let page = self.page_mut(page)?;
        page.widgets.push(WidgetInstance::new(id, kind, Geometry::at(x, y)));
        Ok(&page.widgets[page.widgets.len() - 1])
    }

    pub fn update_widget(&mut self, page: &PageId, widget: &WidgetId, patch: WidgetPatch) -> Result<(), DocumentError> {
        self.widget_mut(page, widget)?.apply(patch)?;
        Ok(())
    }

    pub fn delete_widget(&mut self, page: &PageId, widget: &WidgetId) -> Result<WidgetInstance, DocumentError> {
        let page = self.page_mut(page)?;
        let index = page
            .widgets
            .iter()
            .position(|w| w.id() == widget)
            .ok_or_else(|| DocumentError::WidgetNotFound(widget.clone()))?;
        Ok(page.widgets.remove(index))
    }

    pub fn duplicate_widget(&mut self, page: &PageId, widget: &WidgetId) -> Result<WidgetId, DocumentError> {
        let id = self.fresh_widget_id();
        let copy = self
            .widget(page, widget)?
            .duplicate(id.clone(), DUPLICATE_OFFSET, DUPLICATE_OFFSET);
        self.page_mut(page)?.widgets.push(copy);
        Ok(id)
    }

    /// Append an empty page and return its index. Unnamed pages are called "Page <n>".
    pub fn add_page(&mut self, name: Option<&str>) -> usize {
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Page {}", self.pages.len() + 1),
        };
        let mut id = PageId::generate();
        while self.pages.iter().any(|p| p.id == id) {
            id = PageId::generate();
        }
        self.pages.push(Page::new(id, name));
        self.pages.len() - 1
    }

    pub fn delete_page(&mut self, index: usize) -> Result<Page, DocumentError> {
        if index >= self.pages.len() {
            return Err(DocumentError::PageIndexOutOfRange(index));
        }
        if self.pages.len() <= 1 {
            return Err(DocumentError::LastPage);
        }
        Ok(self.pages.remove(index))
    }

    pub fn rename_page(&mut self, index: usize, name: &str) -> Result<(), DocumentError> {
        let page = self
            .pages
            .get_mut(index)
            .ok_or(DocumentError::PageIndexOutOfRange(index))?;
        page.rename(name.trim());
        Ok(())
    }

    pub fn layout(&self) -> DashboardLayout {
        DashboardLayout {
            pages: self.pages.clone(),
            settings: self.settings,
            share_settings: Some(self.share_settings.clone()),
            filters: self.filters.clone(),
            theme: self.theme.clone(),
        }
    }

    /// Take pages, settings and filters from a checked layout.
    pub fn apply_layout(&mut self, layout: DashboardLayout) {
        self.pages = if layout.pages.is_empty() {
            vec![default_page()]
        } else {
            layout.pages
        };
        self.settings = layout.settings;
        if let Some(share) = layout.share_settings {
            self.share_settings = share;
        }
        self.filters = layout.filters;
        self.theme = layout.theme;
    }

    /// Replace only the pages, as applying a template does.
    pub fn replace_pages(&mut self, pages: Vec<Page>) {
        self.pages = if pages.is_empty() { vec![default_page()] } else { pages };
    }
}

impl FilterSet for Dashboard {
    fn filters(&self) -> &[Filter] {
        &self.filters
    }

    fn filters_mut(&mut self) -> &mut Vec<Filter> {
        &mut self.filters
    }
}

fn default_page() -> Page {
    Page::new(PageId::new("page-1"), "Page 1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::widget::{WidgetConfig, DEFAULT_HEIGHT, DEFAULT_WIDTH};
    use serde_json::json;

    fn first_page(doc: &Dashboard) -> PageId {
        doc.pages()[0].id.clone()
    }

    #[test]
    fn test_new_dashboard_has_one_page() {
        let doc = Dashboard::new("Sales");
        assert_eq!(doc.pages().len(), 1);
        assert_eq!(doc.pages()[0].name, "Page 1");
        assert_eq!(doc.pages()[0].slug, "page-1");
        assert_eq!(doc.id, None);
    }

    #[test]
    fn test_add_widget_defaults() {
        let mut doc = Dashboard::new("Sales");
        let page = first_page(&doc);
        let widget = doc.add_widget(&page, WidgetKind::KpiCard, None).unwrap();

        assert_eq!(widget.geometry, Geometry::new(50, 50, DEFAULT_WIDTH, DEFAULT_HEIGHT));
        assert_eq!(widget.title, "New KPI Card");
        assert_eq!(
            serde_json::Value::Object(widget.config().to_json()),
            json!({"value": "12,345", "change": 12.5, "changeType": "increase"})
        );
    }

    #[test]
    fn test_widget_ids_unique_across_pages() {
        let mut doc = Dashboard::new("Sales");
        let second = doc.add_page(None);
        let pages: Vec<PageId> = doc.pages().iter().map(|p| p.id.clone()).collect();
        let mut seen = HashSet::new();
        for i in 0..50 {
            let page = &pages[i % 2];
            let id = doc.add_widget(page, WidgetKind::Table, None).unwrap().id().clone();
            assert!(seen.insert(id));
        }
        assert_eq!(doc.widget_count(), 50);
        assert_eq!(doc.page_at(second).unwrap().widgets.len(), 25);
    }

    #[test]
    fn test_duplicate_widget_offsets_and_renames() {
        let mut doc = Dashboard::new("Sales");
        let page = first_page(&doc);
        let source = doc.add_widget(&page, WidgetKind::BarChart, Some((100, 120))).unwrap().clone();

        let copy_id = doc.duplicate_widget(&page, source.id()).unwrap();
        let copy = doc.widget(&page, &copy_id).unwrap();

        assert_ne!(copy.id(), source.id());
        assert_eq!(copy.kind(), source.kind());
        assert_eq!(copy.config(), source.config());
        assert_eq!(copy.style, source.style);
        assert_eq!(copy.geometry, source.geometry.offset(20, 20));
        assert_eq!(copy.title, "New Bar Chart Copy");
    }

    #[test]
    fn test_delete_last_page_is_rejected() {
        let mut doc = Dashboard::new("Sales");
        let before = doc.clone();
        assert_eq!(doc.delete_page(0), Err(DocumentError::LastPage));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_add_page_names() {
        let mut doc = Dashboard::new("Sales");
        assert_eq!(doc.add_page(None), 1);
        assert_eq!(doc.add_page(Some("  ")), 2);
        assert_eq!(doc.add_page(Some("Regional")), 3);
        let names: Vec<&str> = doc.pages().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Page 1", "Page 2", "Page 3", "Regional"]);
    }

    #[test]
    fn test_update_unknown_widget() {
        let mut doc = Dashboard::new("Sales");
        let page = first_page(&doc);
        let missing = WidgetId::new("viz-missing");
        assert_eq!(
            doc.update_widget(&page, &missing, WidgetPatch::title("x")),
            Err(DocumentError::WidgetNotFound(missing))
        );
    }

    #[test]
    fn test_layout_round_trip() {
        let mut doc = Dashboard::new("Ops");
        let page = first_page(&doc);
        let kpi = doc.add_widget(&page, WidgetKind::KpiCard, Some((10, 20))).unwrap().id().clone();
        doc.update_widget(&page, &kpi, WidgetPatch::config_key("changeType", "decrease"))
            .unwrap();
        doc.add_widget(&page, WidgetKind::PieChart, None).unwrap();
        let second = doc.add_page(Some("Details"));
        let second_id = doc.page_at(second).unwrap().id.clone();
        doc.add_widget(&second_id, WidgetKind::TextBox, Some((0, 0))).unwrap();
        doc.page_mut(&second_id)
            .unwrap()
            .add_filter(crate::domain::widget::FilterKind::Text);
        doc.settings.zoom = Zoom::new(150);

        let json = serde_json::to_value(doc.layout()).unwrap();
        let parsed = DashboardLayout::parse(json).unwrap();

        let mut restored = Dashboard::new("Ops");
        restored.apply_layout(parsed);
        assert_eq!(restored.pages(), doc.pages());
        assert_eq!(restored.settings, doc.settings);
        let WidgetConfig::Kpi(config) = restored.widget(&page, &kpi).unwrap().config() else {
            panic!("kpi config expected")
        };
        assert_eq!(config.change_type, crate::domain::widget::ChangeType::Decrease);
    }

    #[test]
    fn test_layout_parse_rejects_duplicate_widget_ids() {
        let widget = json!({"id": "1", "type": "table", "title": "t", "x": 0, "y": 0, "width": 100, "height": 100});
        let layout = json!({"pages": [{"id": "p", "name": "P", "visualizations": [widget.clone(), widget]}]});
        assert!(matches!(
            DashboardLayout::parse(layout),
            Err(LayoutError::DuplicateWidget { .. })
        ));
    }

    #[test]
    fn test_layout_parse_fills_in_default_page() {
        let layout = DashboardLayout::parse(json!({})).unwrap();
        assert_eq!(layout.pages.len(), 1);
        assert_eq!(layout.settings.zoom, Zoom::default());
        assert_eq!(DashboardLayout::parse(serde_json::Value::Null).unwrap().pages.len(), 1);
    }

    #[test]
    fn test_zoom_is_clamped_and_stepped() {
        assert_eq!(Zoom::new(10).percent(), 25);
        assert_eq!(Zoom::new(260).percent(), 200);
        assert_eq!(Zoom::new(110).percent(), 100);
        assert_eq!(Zoom::new(115).percent(), 125);
        assert_eq!(Zoom::new(200).zoom_in().percent(), 200);
        assert_eq!(Zoom::new(25).zoom_out().percent(), 25);
        assert_eq!(Zoom::new(50).scale(), 0.5);
    }

    #[test]
    fn test_unknown_dashboard_type_is_custom() {
        let kind: DashboardKind = serde_json::from_value(json!("marketing")).unwrap();
        assert_eq!(kind, DashboardKind::Custom);
        assert_eq!(serde_json::to_value(DashboardKind::Sales).unwrap(), json!("sales"));
    }
}
