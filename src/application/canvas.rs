// Canvas editor - selection, drag/resize interaction, zoom and preview over a dashboard
use crate::domain::dashboard::{CanvasSettings, Dashboard, DocumentError, ViewMode, Zoom};
use crate::domain::ids::{PageId, WidgetId};
use crate::domain::page::Page;
use crate::domain::widget::{Geometry, WidgetInstance, WidgetKind, WidgetPatch, MIN_WIDGET_SIZE};
use thiserror::Error;

/// A dropped palette entry is centred on the pointer: half the default size.
pub const DROP_OFFSET: (f64, f64) = (150.0, 100.0);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EditorError {
    #[error("the canvas is in preview mode")]
    ReadOnly,
    #[error("no widget is selected")]
    NothingSelected,
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Pointer position in screen units, relative to the canvas origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl Handle {
    fn moves_west(self) -> bool {
        matches!(self, Handle::West | Handle::NorthWest | Handle::SouthWest)
    }

    fn moves_east(self) -> bool {
        matches!(self, Handle::East | Handle::NorthEast | Handle::SouthEast)
    }

    fn moves_north(self) -> bool {
        matches!(self, Handle::North | Handle::NorthEast | Handle::NorthWest)
    }

    fn moves_south(self) -> bool {
        matches!(self, Handle::South | Handle::SouthEast | Handle::SouthWest)
    }
}

/// At most one widget is being dragged or resized at any time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Dragging {
        widget: WidgetId,
        offset: Point,
    },
    Resizing {
        widget: WidgetId,
        handle: Handle,
        start: Point,
        origin: Geometry,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Save,
    Duplicate,
    Delete,
}

impl Shortcut {
    /// Map a key press to an editor command. `command` is Ctrl or Cmd.
    pub fn from_key(key: &str, command: bool) -> Option<Self> {
        match (key, command) {
            ("s" | "S", true) => Some(Shortcut::Save),
            ("d" | "D", true) => Some(Shortcut::Duplicate),
            ("Delete", _) => Some(Shortcut::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanvasEditor {
    selected_page: usize,
    selected_widget: Option<WidgetId>,
    interaction: Interaction,
    zoom: Zoom,
    view_mode: ViewMode,
    preview: bool,
    snap: Option<u32>,
}

impl Default for CanvasEditor {
    fn default() -> Self {
        Self::new(CanvasSettings::default(), None)
    }
}

impl CanvasEditor {
    pub fn new(settings: CanvasSettings, snap: Option<u32>) -> Self {
        Self {
            selected_page: 0,
            selected_widget: None,
            interaction: Interaction::Idle,
            zoom: settings.zoom,
            view_mode: settings.view_mode,
            preview: false,
            snap: snap.filter(|grid| *grid > 0),
        }
    }

    pub fn selected_page(&self) -> usize {
        self.selected_page
    }

    pub fn selected_widget(&self) -> Option<&WidgetId> {
        self.selected_widget.as_ref()
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    /// Canvas settings to persist with the document.
    pub fn settings(&self) -> CanvasSettings {
        CanvasSettings {
            view_mode: self.view_mode,
            zoom: self.zoom,
        }
    }

    pub fn current_page<'a>(&self, doc: &'a Dashboard) -> Result<&'a Page, EditorError> {
        Ok(doc.page_at(self.selected_page)?)
    }

    fn current_page_id(&self, doc: &Dashboard) -> Result<PageId, EditorError> {
        Ok(self.current_page(doc)?.id.clone())
    }

    fn editable(&self) -> Result<(), EditorError> {
        if self.preview {
            return Err(EditorError::ReadOnly);
        }
        Ok(())
    }

    fn current_widget<'a>(&self, doc: &'a Dashboard, widget: &WidgetId) -> Result<&'a WidgetInstance, EditorError> {
        self.current_page(doc)?
            .widget(widget)
            .ok_or_else(|| EditorError::Document(DocumentError::WidgetNotFound(widget.clone())))
    }

    pub fn select_widget(&mut self, widget: Option<WidgetId>) {
        self.selected_widget = widget;
    }

    pub fn select_page(&mut self, doc: &Dashboard, index: usize) -> Result<(), EditorError> {
        doc.page_at(index)?;
        self.selected_page = index;
        self.selected_widget = None;
        self.interaction = Interaction::Idle;
        Ok(())
    }

    pub fn pointer_down_on_widget(&mut self, doc: &Dashboard, widget: &WidgetId, pointer: Point) -> Result<(), EditorError> {
        self.editable()?;
        let geometry = self.current_widget(doc, widget)?.geometry;
        let scale = self.zoom.scale();
        self.interaction = Interaction::Dragging {
            widget: widget.clone(),
            offset: Point::new(
                pointer.x - f64::from(geometry.x) * scale,
                pointer.y - f64::from(geometry.y) * scale,
            ),
        };
        self.selected_widget = Some(widget.clone());
        Ok(())
    }

    pub fn pointer_down_on_handle(
        &mut self,
        doc: &Dashboard,
        widget: &WidgetId,
        handle: Handle,
        pointer: Point,
    ) -> Result<(), EditorError> {
        self.editable()?;
        let origin = self.current_widget(doc, widget)?.geometry;
        self.interaction = Interaction::Resizing {
            widget: widget.clone(),
            handle,
            start: pointer,
            origin,
        };
        self.selected_widget = Some(widget.clone());
        Ok(())
    }

    /// Apply pointer movement to the active interaction. Returns the widget's
    /// new geometry, or `None` when nothing is being dragged or resized.
    pub fn pointer_move(&mut self, doc: &mut Dashboard, pointer: Point) -> Result<Option<Geometry>, EditorError> {
        let scale = self.zoom.scale();
        let (widget, patch) = match &self.interaction {
            Interaction::Idle => return Ok(None),
            Interaction::Dragging { widget, offset } => {
                let x = snap((pointer.x - offset.x) / scale, self.snap);
                let y = snap((pointer.y - offset.y) / scale, self.snap);
                (widget.clone(), WidgetPatch::position(x, y))
            }
            Interaction::Resizing {
                widget,
                handle,
                start,
                origin,
            } => {
                let dx = (pointer.x - start.x) / scale;
                let dy = (pointer.y - start.y) / scale;
                let geometry = resize(*origin, *handle, dx, dy);
                (widget.clone(), WidgetPatch::geometry(geometry))
            }
        };

        let page = self.current_page_id(doc)?;
        if let Err(e) = doc.update_widget(&page, &widget, patch) {
            self.interaction = Interaction::Idle;
            return Err(e.into());
        }
        Ok(Some(doc.widget(&page, &widget)?.geometry))
    }

    pub fn pointer_up(&mut self) {
        self.interaction = Interaction::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.interaction = Interaction::Idle;
    }

    /// Add a palette entry dropped at `pointer` and select it.
    pub fn drop_widget(&mut self, doc: &mut Dashboard, kind: WidgetKind, pointer: Point) -> Result<WidgetId, EditorError> {
        self.editable()?;
        let scale = self.zoom.scale();
        let x = (pointer.x / scale - DROP_OFFSET.0).max(0.0).round() as u32;
        let y = (pointer.y / scale - DROP_OFFSET.1).max(0.0).round() as u32;
        self.insert(doc, kind, Some((x, y)))
    }

    /// Add a widget at the default position and select it.
    pub fn add_widget(&mut self, doc: &mut Dashboard, kind: WidgetKind) -> Result<WidgetId, EditorError> {
        self.editable()?;
        self.insert(doc, kind, None)
    }

    fn insert(&mut self, doc: &mut Dashboard, kind: WidgetKind, position: Option<(u32, u32)>) -> Result<WidgetId, EditorError> {
        let page = self.current_page_id(doc)?;
        let id = doc.add_widget(&page, kind, position)?.id().clone();
        tracing::debug!(widget = %id, kind = %kind, "added widget");
        self.selected_widget = Some(id.clone());
        Ok(id)
    }

    pub fn delete_widget(&mut self, doc: &mut Dashboard, widget: &WidgetId) -> Result<WidgetInstance, EditorError> {
        self.editable()?;
        let page = self.current_page_id(doc)?;
        let removed = doc.delete_widget(&page, widget)?;
        if self.selected_widget.as_ref() == Some(widget) {
            self.selected_widget = None;
        }
        if self.active_widget() == Some(widget) {
            self.interaction = Interaction::Idle;
        }
        Ok(removed)
    }

    pub fn delete_selected(&mut self, doc: &mut Dashboard) -> Result<WidgetInstance, EditorError> {
        let widget = self.selected_widget.clone().ok_or(EditorError::NothingSelected)?;
        self.delete_widget(doc, &widget)
    }

    /// Duplicate the selected widget and select the copy.
    pub fn duplicate_selected(&mut self, doc: &mut Dashboard) -> Result<WidgetId, EditorError> {
        self.editable()?;
        let widget = self.selected_widget.clone().ok_or(EditorError::NothingSelected)?;
        let page = self.current_page_id(doc)?;
        let copy = doc.duplicate_widget(&page, &widget)?;
        self.selected_widget = Some(copy.clone());
        Ok(copy)
    }

    /// Append a page and switch to it.
    pub fn add_page(&mut self, doc: &mut Dashboard, name: Option<&str>) -> usize {
        let index = doc.add_page(name);
        self.selected_page = index;
        self.selected_widget = None;
        self.interaction = Interaction::Idle;
        index
    }

    /// Remove a page, keeping the selection on the nearest remaining page.
    pub fn delete_page(&mut self, doc: &mut Dashboard, index: usize) -> Result<Page, EditorError> {
        let removed = doc.delete_page(index)?;
        if self.selected_page > index {
            self.selected_page -= 1;
        } else if self.selected_page == index {
            self.selected_page = index.min(doc.pages().len() - 1);
            self.selected_widget = None;
            self.interaction = Interaction::Idle;
        }
        Ok(removed)
    }

    pub fn zoom_in(&mut self) -> Zoom {
        self.rezoom(self.zoom.zoom_in())
    }

    pub fn zoom_out(&mut self) -> Zoom {
        self.rezoom(self.zoom.zoom_out())
    }

    pub fn set_zoom(&mut self, percent: u16) -> Zoom {
        self.rezoom(Zoom::new(percent))
    }

    /// A drag offset is stored in screen units at the old scale, so any zoom
    /// change ends the drag or resize in progress.
    fn rezoom(&mut self, zoom: Zoom) -> Zoom {
        if zoom != self.zoom {
            self.interaction = Interaction::Idle;
        }
        self.zoom = zoom;
        self.zoom
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    /// Entering preview drops any in-progress drag or resize and the selection.
    pub fn toggle_preview(&mut self) -> bool {
        self.preview = !self.preview;
        if self.preview {
            self.interaction = Interaction::Idle;
            self.selected_widget = None;
        }
        self.preview
    }

    fn active_widget(&self) -> Option<&WidgetId> {
        match &self.interaction {
            Interaction::Idle => None,
            Interaction::Dragging { widget, .. } | Interaction::Resizing { widget, .. } => Some(widget),
        }
    }
}

fn snap(value: f64, grid: Option<u32>) -> u32 {
    let value = value.max(0.0);
    match grid {
        Some(grid) => {
            let grid = f64::from(grid);
            ((value / grid).round() * grid) as u32
        }
        None => value.round() as u32,
    }
}

/// One axis of a resize: `lead` moves the start edge, `trail` the end edge.
fn resize_axis(start: u32, len: u32, delta: f64, lead: bool, trail: bool) -> (u32, u32) {
    let min = f64::from(MIN_WIDGET_SIZE);
    let (start, len) = (f64::from(start), f64::from(len));
    let (new_start, new_len) = if trail {
        (start, (len + delta).max(min))
    } else if lead {
        let end = start + len;
        let new_start = (start + delta).min(end - min).max(0.0);
        (new_start, end - new_start)
    } else {
        (start, len)
    };
    (new_start.round() as u32, new_len.round() as u32)
}

fn resize(origin: Geometry, handle: Handle, dx: f64, dy: f64) -> Geometry {
    let (x, width) = resize_axis(origin.x, origin.width, dx, handle.moves_west(), handle.moves_east());
    let (y, height) = resize_axis(origin.y, origin.height, dy, handle.moves_north(), handle.moves_south());
    Geometry::new(x, y, width, height)
}
