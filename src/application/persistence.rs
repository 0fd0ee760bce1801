// Persistence gateway - saves, loads and versions one dashboard document
use crate::application::dashboard_repository::{DashboardDraft, DashboardRepository, TemplateRow, VersionRow};
use crate::domain::dashboard::{Dashboard, LayoutError};
use crate::domain::data_source::DataSource;
use crate::domain::ids::{DashboardId, UserId};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("dashboard name must not be empty")]
    EmptyName,
    #[error("dashboard '{0}' not found")]
    NotFound(DashboardId),
    #[error("stored layout is invalid: {0}")]
    Layout(#[from] LayoutError),
    #[error("could not encode layout: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Outcome of a successful save. `version` is `None` when the history
/// record could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub id: DashboardId,
    pub version: Option<u32>,
}

pub struct PersistenceGateway {
    repository: Arc<dyn DashboardRepository>,
    /// Held across the whole write so saves run one at a time in arrival order.
    saved_id: Mutex<Option<DashboardId>>,
}

impl PersistenceGateway {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self {
            repository,
            saved_id: Mutex::new(None),
        }
    }

    /// Gateway for a document that already has a stored row.
    pub fn for_existing(repository: Arc<dyn DashboardRepository>, id: DashboardId) -> Self {
        Self {
            repository,
            saved_id: Mutex::new(Some(id)),
        }
    }

    pub fn repository(&self) -> &Arc<dyn DashboardRepository> {
        &self.repository
    }

    /// True while a save holds the write lock. A dropped save releases it.
    pub fn is_saving(&self) -> bool {
        self.saved_id.try_lock().is_err()
    }

    /// Insert on first save, update afterwards, then append a version record.
    /// The document itself is never modified here.
    pub async fn save(&self, dashboard: &Dashboard, user: &UserId) -> Result<SaveReceipt, PersistenceError> {
        if dashboard.name.trim().is_empty() {
            return Err(PersistenceError::EmptyName);
        }

        let mut saved_id = self.saved_id.lock().await;
        self.write(&mut saved_id, dashboard, user).await
    }

    async fn write(
        &self,
        saved_id: &mut Option<DashboardId>,
        dashboard: &Dashboard,
        user: &UserId,
    ) -> Result<SaveReceipt, PersistenceError> {
        let mut draft = DashboardDraft::from_dashboard(dashboard, user)?;

        let id = match saved_id.clone().or_else(|| dashboard.id.clone()) {
            Some(id) => {
                draft.updated_at = Some(Utc::now());
                self.repository.update_dashboard(&id, &draft).await?;
                tracing::info!(dashboard = %id, "updated dashboard");
                id
            }
            None => {
                let id = self.repository.insert_dashboard(&draft).await?;
                tracing::info!(dashboard = %id, "created dashboard");
                id
            }
        };
        *saved_id = Some(id.clone());

        let version = match self.append_version(&id, draft.layout, user).await {
            Ok(number) => Some(number),
            Err(e) => {
                tracing::warn!(dashboard = %id, "failed to record dashboard version: {:#}", e);
                None
            }
        };

        Ok(SaveReceipt { id, version })
    }

    async fn append_version(
        &self,
        id: &DashboardId,
        layout: serde_json::Value,
        user: &UserId,
    ) -> anyhow::Result<u32> {
        let next = self.repository.latest_version(id).await?.unwrap_or(0) + 1;
        self.repository
            .append_version(&VersionRow {
                dashboard_id: id.clone(),
                version_number: next,
                layout,
                created_by: user.clone(),
                created_at: Some(Utc::now()),
            })
            .await?;
        tracing::debug!(dashboard = %id, version = next, "recorded dashboard version");
        Ok(next)
    }

    pub async fn load(&self, id: &DashboardId) -> Result<Dashboard, PersistenceError> {
        let row = self
            .repository
            .get_dashboard(id)
            .await?
            .ok_or_else(|| PersistenceError::NotFound(id.clone()))?;
        Ok(row.into_dashboard()?)
    }

    pub async fn list(&self) -> Result<Vec<Dashboard>, PersistenceError> {
        let rows = self.repository.list_dashboards().await?;
        let mut dashboards = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id.clone();
            match row.into_dashboard() {
                Ok(dashboard) => dashboards.push(dashboard),
                Err(e) => tracing::warn!(dashboard = %id, "skipping dashboard with invalid layout: {}", e),
            }
        }
        Ok(dashboards)
    }

    pub async fn versions(&self, id: &DashboardId) -> Result<Vec<VersionRow>, PersistenceError> {
        Ok(self.repository.list_versions(id).await?)
    }

    pub async fn data_sources(&self) -> Result<Vec<DataSource>, PersistenceError> {
        Ok(self.repository.list_data_sources().await?)
    }

    pub async fn templates(&self) -> Result<Vec<TemplateRow>, PersistenceError> {
        Ok(self.repository.list_templates().await?)
    }

    /// Store the document's pages as a reusable custom template.
    pub async fn save_template(&self, dashboard: &Dashboard, user: &UserId) -> Result<TemplateRow, PersistenceError> {
        if dashboard.name.trim().is_empty() {
            return Err(PersistenceError::EmptyName);
        }
        let template = TemplateRow {
            id: None,
            name: format!("{} Template", dashboard.name.trim()),
            description: Some(dashboard.description.clone()),
            category: "custom".to_string(),
            is_featured: None,
            layout: serde_json::json!({ "pages": dashboard.pages() }),
            created_by: user.clone(),
            created_at: None,
        };
        self.repository.insert_template(&template).await?;
        tracing::info!(template = %template.name, "saved dashboard template");
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_repository::DashboardRow;
    use crate::domain::widget::WidgetKind;
    use crate::infrastructure::memory_repository::MemoryDashboardRepository;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn user() -> UserId {
        UserId::new("user-1")
    }

    fn document(name: &str) -> Dashboard {
        let mut doc = Dashboard::new(name);
        let page = doc.pages()[0].id.clone();
        doc.add_widget(&page, WidgetKind::LineChart, None).unwrap();
        doc
    }

    /// Pauses inserts until released.
    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    /// Delegates to the in-memory store, optionally refusing version writes
    /// or holding inserts at a gate.
    #[derive(Default)]
    struct TestStore {
        inner: MemoryDashboardRepository,
        refuse_versions: bool,
        gate: Option<Arc<Gate>>,
    }

    #[async_trait]
    impl DashboardRepository for TestStore {
        async fn insert_dashboard(&self, draft: &DashboardDraft) -> anyhow::Result<DashboardId> {
            if let Some(gate) = &self.gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            self.inner.insert_dashboard(draft).await
        }
        async fn update_dashboard(&self, id: &DashboardId, draft: &DashboardDraft) -> anyhow::Result<()> {
            self.inner.update_dashboard(id, draft).await
        }
        async fn get_dashboard(&self, id: &DashboardId) -> anyhow::Result<Option<DashboardRow>> {
            self.inner.get_dashboard(id).await
        }
        async fn list_dashboards(&self) -> anyhow::Result<Vec<DashboardRow>> {
            self.inner.list_dashboards().await
        }
        async fn latest_version(&self, id: &DashboardId) -> anyhow::Result<Option<u32>> {
            self.inner.latest_version(id).await
        }
        async fn append_version(&self, version: &VersionRow) -> anyhow::Result<()> {
            if self.refuse_versions {
                anyhow::bail!("dashboard_versions is read-only");
            }
            self.inner.append_version(version).await
        }
        async fn list_versions(&self, id: &DashboardId) -> anyhow::Result<Vec<VersionRow>> {
            self.inner.list_versions(id).await
        }
        async fn list_data_sources(&self) -> anyhow::Result<Vec<DataSource>> {
            self.inner.list_data_sources().await
        }
        async fn list_templates(&self) -> anyhow::Result<Vec<TemplateRow>> {
            self.inner.list_templates().await
        }
        async fn insert_template(&self, template: &TemplateRow) -> anyhow::Result<()> {
            self.inner.insert_template(template).await
        }
    }

    #[tokio::test]
    async fn test_first_save_inserts_then_updates() {
        let repository = Arc::new(MemoryDashboardRepository::new());
        let gateway = PersistenceGateway::new(repository.clone());
        let mut doc = document("Sales");

        let first = gateway.save(&doc, &user()).await.unwrap();
        assert_eq!(first.version, Some(1));

        doc.name = "Sales (EU)".to_string();
        let second = gateway.save(&doc, &user()).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.version, Some(2));

        let rows = repository.list_dashboards().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Sales (EU)");
        assert!(!gateway.is_saving());
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected_before_writing() {
        let repository = Arc::new(MemoryDashboardRepository::new());
        let gateway = PersistenceGateway::new(repository.clone());

        let result = gateway.save(&document("   "), &user()).await;
        assert!(matches!(result, Err(PersistenceError::EmptyName)));
        assert!(repository.list_dashboards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_first_saves_insert_once() {
        let repository = Arc::new(MemoryDashboardRepository::new());
        let gateway = PersistenceGateway::new(repository.clone());
        let doc = document("Ops");
        let user = user();

        let (a, b) = tokio::join!(gateway.save(&doc, &user), gateway.save(&doc, &user));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.id, b.id);
        assert_eq!(repository.list_dashboards().await.unwrap().len(), 1);
        let mut numbers: Vec<u32> = repository
            .list_versions(&a.id)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.version_number)
            .collect();
        numbers.sort();
        assert_eq!(numbers, [1, 2]);
    }

    #[tokio::test]
    async fn test_is_saving_while_write_in_flight() {
        let gate = Arc::new(Gate::default());
        let store = TestStore {
            gate: Some(gate.clone()),
            ..TestStore::default()
        };
        let gateway = Arc::new(PersistenceGateway::new(Arc::new(store)));
        assert!(!gateway.is_saving());

        let task = tokio::spawn({
            let gateway = gateway.clone();
            async move {
                let doc = document("Ops");
                gateway.save(&doc, &user()).await
            }
        });
        gate.entered.notified().await;
        assert!(gateway.is_saving());

        gate.release.notify_one();
        task.await.unwrap().unwrap();
        assert!(!gateway.is_saving());
    }

    #[tokio::test]
    async fn test_cancelled_save_clears_saving() {
        let store = TestStore {
            gate: Some(Arc::new(Gate::default())),
            ..TestStore::default()
        };
        let gateway = PersistenceGateway::new(Arc::new(store));
        let doc = document("Ops");
        let user = user();

        let timed_out = tokio::time::timeout(Duration::from_millis(50), gateway.save(&doc, &user)).await;
        assert!(timed_out.is_err());
        assert!(!gateway.is_saving());
    }

    #[tokio::test]
    async fn test_version_failure_does_not_fail_save() {
        let store = TestStore {
            refuse_versions: true,
            ..TestStore::default()
        };
        let gateway = PersistenceGateway::new(Arc::new(store));
        let receipt = gateway.save(&document("Finance"), &user()).await.unwrap();
        assert_eq!(receipt.version, None);
        assert!(gateway.load(&receipt.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_versions_newest_first() {
        let repository = Arc::new(MemoryDashboardRepository::new());
        let gateway = PersistenceGateway::new(repository);
        let doc = document("Finance");

        let mut id = None;
        for _ in 0..3 {
            id = Some(gateway.save(&doc, &user()).await.unwrap().id);
        }
        let versions = gateway.versions(&id.unwrap()).await.unwrap();
        let numbers: Vec<u32> = versions.iter().map(|v| v.version_number).collect();
        assert_eq!(numbers, [3, 2, 1]);
    }

    #[tokio::test]
    async fn test_list_skips_invalid_layouts() {
        let repository = Arc::new(MemoryDashboardRepository::new());
        let gateway = PersistenceGateway::new(repository.clone());
        gateway.save(&document("Good"), &user()).await.unwrap();

        let broken: DashboardRow = serde_json::from_value(json!({
            "id": "broken",
            "name": "Broken",
            "created_by": "user-1",
            "layout": {"pages": [
                {"id": "p1", "name": "One", "visualizations": []},
                {"id": "p1", "name": "Two", "visualizations": []}
            ]}
        }))
        .unwrap();
        repository.put_dashboard(broken).await;

        let listed = gateway.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Good");
    }

    #[tokio::test]
    async fn test_data_sources_accept_unknown_kinds() {
        let source: DataSource = serde_json::from_value(json!({
            "id": "src-1",
            "name": "budget",
            "type": "excel",
            "created_by": "user-1"
        }))
        .unwrap();
        let repository = Arc::new(MemoryDashboardRepository::with_data_sources(vec![source]));
        let gateway = PersistenceGateway::new(repository);

        let sources = gateway.data_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name, "budget");
    }

    #[tokio::test]
    async fn test_load_round_trips_pages() {
        let repository = Arc::new(MemoryDashboardRepository::new());
        let gateway = PersistenceGateway::new(repository);
        let mut doc = document("Service");
        doc.add_page(Some("Backlog"));

        let receipt = gateway.save(&doc, &user()).await.unwrap();
        let loaded = gateway.load(&receipt.id).await.unwrap();

        assert_eq!(loaded.id, Some(receipt.id));
        assert_eq!(loaded.pages(), doc.pages());
        assert_eq!(loaded.created_by, Some(user()));

        let missing = DashboardId::new("nope");
        assert!(matches!(gateway.load(&missing).await, Err(PersistenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_save_template_names_and_categorises() {
        let repository = Arc::new(MemoryDashboardRepository::new());
        let gateway = PersistenceGateway::new(repository);
        gateway.save_template(&document("Sales"), &user()).await.unwrap();

        let templates = gateway.templates().await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "Sales Template");
        assert_eq!(templates[0].category, "custom");
        assert_eq!(templates[0].pages().unwrap()[0].widgets.len(), 1);
    }
}
