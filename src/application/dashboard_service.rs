// Dashboard service - Use cases for viewing shared dashboards
use crate::application::dashboard_repository::DashboardRepository;
use crate::application::persistence::PersistenceError;
use crate::application::session::{EditorSession, ExportFile, SessionOptions};
use crate::domain::dashboard::{Dashboard, DashboardKind};
use crate::domain::ids::{DashboardId, UserId};
use crate::domain::render::{render_page, RenderedPage};
use crate::domain::share::ShareLinks;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub id: DashboardId,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: DashboardKind,
    pub page_count: usize,
    pub widget_count: usize,
    pub share: ShareLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedDashboard {
    pub id: DashboardId,
    pub name: String,
    pub description: String,
    pub share: ShareLinks,
    pub pages: Vec<RenderedPage>,
}

/// How a dashboard is being viewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Link,
    Embed,
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn DashboardRepository>,
    options: SessionOptions,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn DashboardRepository>, options: SessionOptions) -> Self {
        Self { repository, options }
    }

    /// Editor for a new dashboard, using the configured zoom and snapping.
    pub fn new_editor(&self, user: UserId, name: &str) -> EditorSession {
        EditorSession::create(self.repository.clone(), user, name, self.options.clone())
    }

    pub async fn open_editor(&self, id: &DashboardId, user: UserId) -> Result<EditorSession, PersistenceError> {
        EditorSession::open(self.repository.clone(), id, user, self.options.clone()).await
    }

    fn share_links(&self, id: &DashboardId, dashboard: &Dashboard) -> ShareLinks {
        ShareLinks::new(&self.options.origin, id, &dashboard.share_settings)
    }

    /// Dashboards anyone with the link may see.
    pub async fn list_public(&self) -> anyhow::Result<Vec<DashboardSummary>> {
        let now = Utc::now();
        let mut summaries = Vec::new();
        for row in self.repository.list_dashboards().await? {
            let id = row.id.clone();
            let dashboard = match row.into_dashboard() {
                Ok(dashboard) => dashboard,
                Err(e) => {
                    tracing::warn!(dashboard = %id, "skipping dashboard with invalid layout: {}", e);
                    continue;
                }
            };
            if !visible(&dashboard, Access::Link, now) {
                continue;
            }
            summaries.push(DashboardSummary {
                share: self.share_links(&id, &dashboard),
                id,
                page_count: dashboard.pages().len(),
                widget_count: dashboard.widget_count(),
                name: dashboard.name,
                description: dashboard.description,
                kind: dashboard.kind,
                updated_at: dashboard.updated_at,
            });
        }
        Ok(summaries)
    }

    /// Load a dashboard if it may be viewed with `access`.
    async fn load_visible(&self, id: &DashboardId, access: Access) -> anyhow::Result<Option<Dashboard>> {
        let Some(row) = self.repository.get_dashboard(id).await? else {
            return Ok(None);
        };
        let dashboard = row.into_dashboard()?;
        if !visible(&dashboard, access, Utc::now()) {
            tracing::debug!(dashboard = %id, ?access, "dashboard is not shared for this access");
            return Ok(None);
        }
        Ok(Some(dashboard))
    }

    pub async fn render(&self, id: &DashboardId, access: Access) -> anyhow::Result<Option<RenderedDashboard>> {
        let Some(dashboard) = self.load_visible(id, access).await? else {
            return Ok(None);
        };

        let uses_sources = dashboard
            .pages()
            .iter()
            .any(|page| page.widgets.iter().any(|w| w.data_source.is_some()));
        let sources = if uses_sources {
            match self.repository.list_data_sources().await {
                Ok(sources) => sources.into_iter().map(|s| (s.id.clone(), s)).collect(),
                Err(e) => {
                    tracing::error!(dashboard = %id, "Error fetching data sources: {:#}", e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Some(RenderedDashboard {
            id: id.clone(),
            share: self.share_links(id, &dashboard),
            pages: dashboard.pages().iter().map(|page| render_page(page, &sources)).collect(),
            name: dashboard.name,
            description: dashboard.description,
        }))
    }

    pub async fn export(&self, id: &DashboardId) -> anyhow::Result<Option<ExportFile>> {
        match self.load_visible(id, Access::Link).await? {
            Some(dashboard) => Ok(Some(ExportFile::of(&dashboard)?)),
            None => Ok(None),
        }
    }
}

fn visible(dashboard: &Dashboard, access: Access, now: DateTime<Utc>) -> bool {
    if !dashboard.is_public || dashboard.share_settings.is_expired(now) {
        return false;
    }
    match access {
        Access::Link => true,
        Access::Embed => dashboard.share_settings.allow_embedding,
    }
}
