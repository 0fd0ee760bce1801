// Repository trait for dashboard storage, plus the table rows it exchanges
use crate::domain::dashboard::{Dashboard, DashboardKind, DashboardLayout, LayoutError};
use crate::domain::data_source::DataSource;
use crate::domain::ids::{DashboardId, UserId};
use crate::domain::page::Page;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of the `dashboards` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRow {
    pub id: DashboardId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: DashboardKind,
    #[serde(default)]
    pub is_public: Option<bool>,
    pub created_by: UserId,
    #[serde(default)]
    pub layout: Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DashboardRow {
    /// Rebuild the document. Fails when the stored layout is malformed.
    pub fn into_dashboard(self) -> Result<Dashboard, LayoutError> {
        let layout = DashboardLayout::parse(self.layout)?;
        let mut dashboard = Dashboard::new(self.name);
        dashboard.apply_layout(layout);
        dashboard.id = Some(self.id);
        dashboard.description = self.description.unwrap_or_default();
        dashboard.kind = self.kind;
        dashboard.is_public = self.is_public.unwrap_or(false);
        dashboard.share_settings.is_public = dashboard.is_public;
        dashboard.created_by = Some(self.created_by);
        dashboard.created_at = self.created_at;
        dashboard.updated_at = self.updated_at;
        Ok(dashboard)
    }
}

/// Columns written on insert and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardDraft {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: DashboardKind,
    pub is_public: bool,
    pub created_by: UserId,
    pub layout: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DashboardDraft {
    pub fn from_dashboard(dashboard: &Dashboard, user: &UserId) -> serde_json::Result<Self> {
        Ok(Self {
            name: dashboard.name.trim().to_string(),
            description: dashboard.description.clone(),
            kind: dashboard.kind,
            is_public: dashboard.is_public,
            created_by: dashboard.created_by.clone().unwrap_or_else(|| user.clone()),
            layout: serde_json::to_value(dashboard.layout())?,
            updated_at: None,
        })
    }
}

/// One row of the append-only `dashboard_versions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRow {
    pub dashboard_id: DashboardId,
    pub version_number: u32,
    #[serde(default)]
    pub layout: Value,
    pub created_by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One row of the `dashboard_templates` table. Only `layout.pages` is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    #[serde(default)]
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub layout: Value,
    pub created_by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TemplateRow {
    pub fn pages(&self) -> Result<Vec<Page>, LayoutError> {
        let pages = self.layout.get("pages").cloned().unwrap_or(Value::Null);
        if pages.is_null() {
            return Ok(Vec::new());
        }
        let mut wrapper = serde_json::Map::new();
        wrapper.insert("pages".to_string(), pages);
        Ok(DashboardLayout::parse(Value::Object(wrapper))?.pages)
    }
}

#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Insert a dashboard and return the id the store assigned.
    async fn insert_dashboard(&self, draft: &DashboardDraft) -> anyhow::Result<DashboardId>;

    async fn update_dashboard(&self, id: &DashboardId, draft: &DashboardDraft) -> anyhow::Result<()>;

    async fn get_dashboard(&self, id: &DashboardId) -> anyhow::Result<Option<DashboardRow>>;

    /// All dashboards, most recently updated first.
    async fn list_dashboards(&self) -> anyhow::Result<Vec<DashboardRow>>;

    /// Highest version number recorded for a dashboard.
    async fn latest_version(&self, id: &DashboardId) -> anyhow::Result<Option<u32>>;

    async fn append_version(&self, version: &VersionRow) -> anyhow::Result<()>;

    /// Versions of a dashboard, newest first.
    async fn list_versions(&self, id: &DashboardId) -> anyhow::Result<Vec<VersionRow>>;

    async fn list_data_sources(&self) -> anyhow::Result<Vec<DataSource>>;

    /// Templates, featured first, then newest first.
    async fn list_templates(&self) -> anyhow::Result<Vec<TemplateRow>>;

    async fn insert_template(&self, template: &TemplateRow) -> anyhow::Result<()>;
}
