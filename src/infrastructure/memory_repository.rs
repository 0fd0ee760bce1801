// In-memory dashboard repository for local runs and tests
use crate::application::dashboard_repository::{
    DashboardDraft, DashboardRepository, DashboardRow, TemplateRow, VersionRow,
};
use crate::domain::data_source::DataSource;
use crate::domain::ids::DashboardId;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryDashboardRepository {
    dashboards: RwLock<HashMap<DashboardId, DashboardRow>>,
    versions: RwLock<Vec<VersionRow>>,
    data_sources: RwLock<Vec<DataSource>>,
    templates: RwLock<Vec<TemplateRow>>,
}

impl MemoryDashboardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_sources(data_sources: Vec<DataSource>) -> Self {
        Self {
            data_sources: RwLock::new(data_sources),
            ..Self::default()
        }
    }

    /// Store a row as-is, keeping its id. Used to seed fixtures.
    pub async fn put_dashboard(&self, row: DashboardRow) {
        self.dashboards.write().await.insert(row.id.clone(), row);
    }
}

#[async_trait]
impl DashboardRepository for MemoryDashboardRepository {
    async fn insert_dashboard(&self, draft: &DashboardDraft) -> Result<DashboardId> {
        let id = DashboardId::generate();
        let now = Utc::now();
        let row = DashboardRow {
            id: id.clone(),
            name: draft.name.clone(),
            description: Some(draft.description.clone()),
            kind: draft.kind,
            is_public: Some(draft.is_public),
            created_by: draft.created_by.clone(),
            layout: draft.layout.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.dashboards.write().await.insert(id.clone(), row);
        Ok(id)
    }

    async fn update_dashboard(&self, id: &DashboardId, draft: &DashboardDraft) -> Result<()> {
        let mut dashboards = self.dashboards.write().await;
        let row = match dashboards.get_mut(id) {
            Some(row) => row,
            None => anyhow::bail!("dashboard {} does not exist", id),
        };
        row.name = draft.name.clone();
        row.description = Some(draft.description.clone());
        row.kind = draft.kind;
        row.is_public = Some(draft.is_public);
        row.layout = draft.layout.clone();
        row.updated_at = Some(draft.updated_at.unwrap_or_else(Utc::now));
        Ok(())
    }

    async fn get_dashboard(&self, id: &DashboardId) -> Result<Option<DashboardRow>> {
        Ok(self.dashboards.read().await.get(id).cloned())
    }

    async fn list_dashboards(&self) -> Result<Vec<DashboardRow>> {
        let mut rows: Vec<DashboardRow> = self.dashboards.read().await.values().cloned().collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn latest_version(&self, id: &DashboardId) -> Result<Option<u32>> {
        Ok(self
            .versions
            .read()
            .await
            .iter()
            .filter(|v| &v.dashboard_id == id)
            .map(|v| v.version_number)
            .max())
    }

    async fn append_version(&self, version: &VersionRow) -> Result<()> {
        let mut versions = self.versions.write().await;
        if versions
            .iter()
            .any(|v| v.dashboard_id == version.dashboard_id && v.version_number == version.version_number)
        {
            anyhow::bail!(
                "version {} of dashboard {} already exists",
                version.version_number,
                version.dashboard_id
            );
        }
        versions.push(version.clone());
        Ok(())
    }

    async fn list_versions(&self, id: &DashboardId) -> Result<Vec<VersionRow>> {
        let mut versions: Vec<VersionRow> = self
            .versions
            .read()
            .await
            .iter()
            .filter(|v| &v.dashboard_id == id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        Ok(versions)
    }

    async fn list_data_sources(&self) -> Result<Vec<DataSource>> {
        Ok(self.data_sources.read().await.clone())
    }

    async fn list_templates(&self) -> Result<Vec<TemplateRow>> {
        let mut templates = self.templates.read().await.clone();
        templates.sort_by(|a, b| {
            b.is_featured
                .unwrap_or(false)
                .cmp(&a.is_featured.unwrap_or(false))
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(templates)
    }

    async fn insert_template(&self, template: &TemplateRow) -> Result<()> {
        let mut row = template.clone();
        row.id.get_or_insert_with(|| uuid::Uuid::new_v4().to_string());
        row.created_at.get_or_insert_with(Utc::now);
        self.templates.write().await.push(row);
        Ok(())
    }
}
