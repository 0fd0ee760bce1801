// Editor session - one open dashboard with its canvas state, save gateway and notices
use crate::application::canvas::{CanvasEditor, EditorError, Point, Shortcut};
use crate::application::dashboard_repository::{DashboardRepository, TemplateRow};
use crate::application::persistence::{PersistenceError, PersistenceGateway, SaveReceipt};
use crate::application::properties::{apply_field, FieldKey};
use crate::domain::dashboard::{Dashboard, DocumentError, Zoom};
use crate::domain::data_source::DataSource;
use crate::domain::filter::{FilterSet, FilterValue};
use crate::domain::ids::{DashboardId, FilterId, UserId, WidgetId};
use crate::domain::render::{render_page, RenderedPage};
use crate::domain::share::{ShareLinks, ShareRole, ShareSettings};
use crate::domain::widget::{FilterKind, WidgetKind};
use std::collections::HashMap;
use std::sync::Arc;

pub const SAVED: &str = "Dashboard saved successfully";
pub const SAVE_FAILED: &str = "Failed to save dashboard";
pub const NAME_REQUIRED: &str = "Please enter a dashboard name";
pub const LAST_PAGE: &str = "Cannot delete the last page";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A toast for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    Dashboard,
    CurrentPage,
}

/// A downloadable JSON copy of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: String,
}

impl ExportFile {
    /// Pretty JSON of the whole document, named after it.
    pub fn of(document: &Dashboard) -> serde_json::Result<Self> {
        Ok(Self {
            file_name: format!("{}.json", document.name),
            contents: serde_json::to_string_pretty(document)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Origin used to build share links, e.g. `https://bi.example.com`.
    pub origin: String,
    /// Grid size for dragging, if snapping is on.
    pub snap: Option<u32>,
    /// Zoom a new dashboard starts at.
    pub zoom: Zoom,
}

pub struct EditorSession {
    document: Dashboard,
    editor: CanvasEditor,
    gateway: Arc<PersistenceGateway>,
    user: UserId,
    options: SessionOptions,
    notices: Vec<Notice>,
}

impl EditorSession {
    /// Start editing a new, unsaved dashboard.
    pub fn create(repository: Arc<dyn DashboardRepository>, user: UserId, name: &str, options: SessionOptions) -> Self {
        let mut document = Dashboard::new(name);
        document.settings.zoom = options.zoom;
        let editor = CanvasEditor::new(document.settings, options.snap);
        Self {
            document,
            editor,
            gateway: Arc::new(PersistenceGateway::new(repository)),
            user,
            options,
            notices: Vec::new(),
        }
    }

    /// Open a stored dashboard for editing.
    pub async fn open(
        repository: Arc<dyn DashboardRepository>,
        id: &DashboardId,
        user: UserId,
        options: SessionOptions,
    ) -> Result<Self, PersistenceError> {
        let gateway = PersistenceGateway::for_existing(repository, id.clone());
        let document = gateway.load(id).await?;
        let editor = CanvasEditor::new(document.settings, options.snap);
        Ok(Self {
            document,
            editor,
            gateway: Arc::new(gateway),
            user,
            options,
            notices: Vec::new(),
        })
    }

    pub fn document(&self) -> &Dashboard {
        &self.document
    }

    pub fn editor(&self) -> &CanvasEditor {
        &self.editor
    }

    /// Editor and document together, for pointer handling.
    pub fn canvas(&mut self) -> (&mut CanvasEditor, &mut Dashboard) {
        (&mut self.editor, &mut self.document)
    }

    pub fn gateway(&self) -> &Arc<PersistenceGateway> {
        &self.gateway
    }

    pub fn is_saving(&self) -> bool {
        self.gateway.is_saving()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn set_name(&mut self, name: &str) {
        self.document.name = name.to_string();
    }

    pub fn set_description(&mut self, description: &str) {
        self.document.description = description.to_string();
    }

    fn report(&mut self, error: EditorError) {
        let message = match &error {
            EditorError::Document(DocumentError::LastPage) => LAST_PAGE.to_string(),
            other => other.to_string(),
        };
        tracing::debug!("editor rejected operation: {}", error);
        self.notices.push(Notice::error(message));
    }

    fn guard<T>(&mut self, result: Result<T, EditorError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    pub fn add_widget(&mut self, kind: WidgetKind) -> Option<WidgetId> {
        let result = self.editor.add_widget(&mut self.document, kind);
        self.guard(result)
    }

    pub fn drop_widget(&mut self, kind: WidgetKind, pointer: Point) -> Option<WidgetId> {
        let result = self.editor.drop_widget(&mut self.document, kind, pointer);
        self.guard(result)
    }

    pub fn delete_selected(&mut self) -> bool {
        let result = self.editor.delete_selected(&mut self.document);
        self.guard(result).is_some()
    }

    pub fn duplicate_selected(&mut self) -> Option<WidgetId> {
        let result = self.editor.duplicate_selected(&mut self.document);
        self.guard(result)
    }

    pub fn add_page(&mut self, name: Option<&str>) -> usize {
        self.editor.add_page(&mut self.document, name)
    }

    pub fn delete_page(&mut self, index: usize) -> bool {
        let result = self.editor.delete_page(&mut self.document, index);
        self.guard(result).is_some()
    }

    pub fn select_page(&mut self, index: usize) -> bool {
        let result = self.editor.select_page(&self.document, index);
        self.guard(result).is_some()
    }

    pub fn rename_page(&mut self, index: usize, name: &str) -> bool {
        let result = self.document.rename_page(index, name).map_err(EditorError::from);
        self.guard(result).is_some()
    }

    pub fn toggle_preview(&mut self) -> bool {
        self.editor.toggle_preview()
    }

    /// Edit one property of the selected widget from raw input.
    pub fn set_field(&mut self, key: FieldKey, raw: &str) -> bool {
        let Some(widget) = self.editor.selected_widget().cloned() else {
            self.report(EditorError::NothingSelected);
            return false;
        };
        if self.editor.is_preview() {
            self.report(EditorError::ReadOnly);
            return false;
        }
        let page = match self.editor.current_page(&self.document) {
            Ok(page) => page.id.clone(),
            Err(e) => {
                self.report(e);
                return false;
            }
        };
        match apply_field(&mut self.document, &page, &widget, key, raw) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(widget = %widget, "rejected field input: {}", e);
                self.notices.push(Notice::error(e.to_string()));
                false
            }
        }
    }

    /// Persist the document. Failures become notices; the document is kept as is.
    pub async fn save(&mut self) -> Option<SaveReceipt> {
        self.document.settings = self.editor.settings();
        self.document.is_public = self.document.share_settings.is_public;

        match self.gateway.save(&self.document, &self.user).await {
            Ok(receipt) => {
                self.document.id = Some(receipt.id.clone());
                if self.document.created_by.is_none() {
                    self.document.created_by = Some(self.user.clone());
                }
                self.notices.push(Notice::success(SAVED));
                Some(receipt)
            }
            Err(PersistenceError::EmptyName) => {
                self.notices.push(Notice::error(NAME_REQUIRED));
                None
            }
            Err(e) => {
                tracing::error!("Error saving dashboard: {:#}", e);
                self.notices.push(Notice::error(SAVE_FAILED));
                None
            }
        }
    }

    /// Duplicate and Delete do nothing, without a notice, when no widget is selected.
    pub async fn handle_shortcut(&mut self, shortcut: Shortcut) {
        let selected = self.editor.selected_widget().is_some();
        match shortcut {
            Shortcut::Save => {
                self.save().await;
            }
            Shortcut::Duplicate if selected => {
                self.duplicate_selected();
            }
            Shortcut::Delete if selected => {
                self.delete_selected();
            }
            Shortcut::Duplicate | Shortcut::Delete => {}
        }
    }

    /// Replace the pages with a template's and go to the first page.
    pub fn apply_template(&mut self, template: &TemplateRow) -> bool {
        match template.pages() {
            Ok(pages) => {
                self.document.replace_pages(pages);
                let reset = self.editor.select_page(&self.document, 0);
                self.guard(reset);
                self.notices.push(Notice::success(format!("Applied template \"{}\"", template.name)));
                true
            }
            Err(e) => {
                tracing::warn!(template = %template.name, "template layout is invalid: {}", e);
                self.notices.push(Notice::error("Failed to apply template"));
                false
            }
        }
    }

    pub async fn save_as_template(&mut self) -> Option<TemplateRow> {
        match self.gateway.save_template(&self.document, &self.user).await {
            Ok(template) => {
                self.notices.push(Notice::success("Template saved successfully"));
                Some(template)
            }
            Err(PersistenceError::EmptyName) => {
                self.notices.push(Notice::error(NAME_REQUIRED));
                None
            }
            Err(e) => {
                tracing::error!("Error saving template: {:#}", e);
                self.notices.push(Notice::error("Failed to save template"));
                None
            }
        }
    }

    pub fn export(&self) -> serde_json::Result<ExportFile> {
        let mut document = self.document.clone();
        document.settings = self.editor.settings();
        ExportFile::of(&document)
    }

    /// Links for a saved dashboard; `None` until it has an id.
    pub fn share_links(&self) -> Option<ShareLinks> {
        let id = self.document.id.as_ref()?;
        Some(ShareLinks::new(&self.options.origin, id, &self.document.share_settings))
    }

    pub fn share_settings_mut(&mut self) -> &mut ShareSettings {
        &mut self.document.share_settings
    }

    pub fn share_with(&mut self, email: &str, role: ShareRole) -> bool {
        match self.document.share_settings.add_user(email, role) {
            Ok(()) => true,
            Err(e) => {
                self.notices.push(Notice::error(e.to_string()));
                false
            }
        }
    }

    pub fn unshare(&mut self, email: &str) -> bool {
        match self.document.share_settings.remove_user(email) {
            Ok(_) => true,
            Err(e) => {
                self.notices.push(Notice::error(e.to_string()));
                false
            }
        }
    }

    fn filters_mut(&mut self, scope: FilterScope) -> Result<&mut dyn FilterSet, DocumentError> {
        match scope {
            FilterScope::Dashboard => Ok(&mut self.document as &mut dyn FilterSet),
            FilterScope::CurrentPage => {
                let page = self.document.page_at(self.editor.selected_page())?.id.clone();
                Ok(self.document.page_mut(&page)? as &mut dyn FilterSet)
            }
        }
    }

    pub fn add_filter(&mut self, scope: FilterScope, kind: FilterKind) -> Option<FilterId> {
        let result = self.filters_mut(scope).map(|set| set.add_filter(kind));
        self.guard(result.map_err(EditorError::from))
    }

    pub fn set_filter_value(&mut self, scope: FilterScope, id: &FilterId, value: FilterValue) -> bool {
        let result = self
            .filters_mut(scope)
            .and_then(|set| Ok(set.filter_mut(id)?.set_value(value)?));
        self.guard(result.map_err(EditorError::from)).is_some()
    }

    pub fn remove_filter(&mut self, scope: FilterScope, id: &FilterId) -> bool {
        let result = self
            .filters_mut(scope)
            .and_then(|set| Ok(set.remove_filter(id)?));
        self.guard(result.map_err(EditorError::from)).is_some()
    }

    pub fn clear_filters(&mut self, scope: FilterScope) -> bool {
        let result = self.filters_mut(scope).map(|set| set.clear_filter_values());
        self.guard(result.map_err(EditorError::from)).is_some()
    }

    /// Render the page being edited with the given data sources.
    pub fn render_current_page(&self, sources: &[DataSource]) -> Option<RenderedPage> {
        let page = self.editor.current_page(&self.document).ok()?;
        let sources: HashMap<_, _> = sources.iter().map(|s| (s.id.clone(), s.clone())).collect();
        Some(render_page(page, &sources))
    }
}
