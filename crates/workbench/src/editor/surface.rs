// Request body editor: owns the buffer and keeps widgets in step with it.
//
// Every buffer change and every viewport change triggers a full annotation
// re-scan, followed by a reconcile pass against mounted widgets: widgets whose
// annotation survived keep their state, the rest are unmounted.

use std::ops::Range;

use chrono::{DateTime, Utc};
use rpcdesk_common::schema::{MessageInfo, SchemaIndex};
use tracing::trace;

use super::annotator::{annotate, Annotation};
use super::completion::{complete, CompletionContext, CompletionItem, CompletionList};
use super::widgets::{Widget, WidgetHost};

pub type WidgetId = u64;
type ChangeListener = Box<dyn FnMut(&str) + Send>;

struct MountedWidget<Handle> {
    id: WidgetId,
    annotation: Annotation,
    widget: Widget,
    handle: Handle,
}

pub struct EditorSurface<H: WidgetHost> {
    text: String,
    cursor: usize,
    read_only: bool,
    schema: Option<SchemaIndex>,
    annotations: Vec<Annotation>,
    host: H,
    mounted: Vec<MountedWidget<H::Handle>>,
    next_widget_id: WidgetId,
    listeners: Vec<ChangeListener>,
    clock: fn() -> DateTime<Utc>,
    scans: u64,
}

impl<H: WidgetHost> EditorSurface<H> {
    pub fn new(host: H, text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        Self {
            text,
            cursor,
            read_only: false,
            schema: None,
            annotations: Vec::new(),
            host,
            mounted: Vec::new(),
            next_widget_id: 1,
            listeners: Vec::new(),
            clock: Utc::now,
            scans: 0,
        }
    }

    /// Replace the clock used to seed timestamp widgets.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Number of annotation passes run so far.
    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    pub fn schema(&self) -> Option<&SchemaIndex> {
        self.schema.as_ref()
    }

    /// Install the schema of the selected method; `None` clears it.
    pub fn set_schema(&mut self, message: Option<&MessageInfo>) {
        self.schema = message.map(|message| SchemaIndex::build(Some(message)));
        self.rescan();
    }

    pub fn on_change(&mut self, listener: impl FnMut(&str) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Apply a value coming from outside (store hydration, response pane).
    /// Identical text is ignored; listeners are not notified.
    pub fn set_value(&mut self, value: &str) -> bool {
        if self.text == value {
            return false;
        }
        self.text.clear();
        self.text.push_str(value);
        self.cursor = floor_char_boundary(&self.text, self.cursor);
        self.rescan();
        true
    }

    /// A user edit: replace `range` with `insert`, leaving the cursor after it.
    pub fn edit(&mut self, range: Range<usize>, insert: &str) -> bool {
        if self.read_only
            || range.start > range.end
            || range.end > self.text.len()
            || !self.text.is_char_boundary(range.start)
            || !self.text.is_char_boundary(range.end)
        {
            return false;
        }
        self.text.replace_range(range.clone(), insert);
        self.cursor = range.start + insert.len();
        self.changed();
        true
    }

    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = floor_char_boundary(&self.text, offset.min(self.text.len()));
    }

    /// The visible region moved or the editor became visible again.
    pub fn viewport_changed(&mut self) {
        self.rescan();
    }

    // ── Completion ─────────────────────────────────────────────────

    pub fn completions(&self, explicit: bool) -> Option<CompletionList> {
        complete(
            self.schema.as_ref(),
            self.read_only,
            CompletionContext { text: &self.text, cursor: self.cursor, explicit },
        )
    }

    /// Replace `from..cursor` with the chosen candidate.
    pub fn accept_completion(&mut self, from: usize, item: &CompletionItem) -> bool {
        if from > self.cursor {
            return false;
        }
        self.edit(from..self.cursor, &item.label)
    }

    // ── Widgets ────────────────────────────────────────────────────

    pub fn widgets(&self) -> impl Iterator<Item = (WidgetId, usize, &Widget)> {
        self.mounted.iter().map(|mounted| (mounted.id, mounted.annotation.offset, &mounted.widget))
    }

    pub fn widget_mut(&mut self, id: WidgetId) -> Option<&mut Widget> {
        self.mounted.iter_mut().find(|mounted| mounted.id == id).map(|mounted| &mut mounted.widget)
    }

    /// Write the widget's value back into the buffer: one mutation, one
    /// re-scan. Returns false when nothing changed.
    pub fn apply_widget(&mut self, id: WidgetId) -> bool {
        if self.read_only {
            return false;
        }
        let Some(mounted) = self.mounted.iter().find(|mounted| mounted.id == id) else {
            return false;
        };
        let Some(updated) = mounted.widget.apply(&self.text) else {
            return false;
        };
        if updated == self.text {
            return false;
        }
        self.text = updated;
        self.cursor = floor_char_boundary(&self.text, self.cursor.min(self.text.len()));
        self.changed();
        true
    }

    fn changed(&mut self) {
        for listener in &mut self.listeners {
            listener(&self.text);
        }
        self.rescan();
    }

    fn rescan(&mut self) {
        self.scans += 1;
        self.annotations = match &self.schema {
            Some(index) => annotate(&self.text, index),
            None => Vec::new(),
        };
        self.reconcile();
    }

    fn reconcile(&mut self) {
        let current = &self.annotations;
        let (kept, stale): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.mounted).into_iter().partition(|m| current.contains(&m.annotation));
        for mounted in stale {
            self.host.unmount(mounted.handle);
        }
        self.mounted = kept;

        let Some(index) = self.schema.as_ref() else {
            return;
        };
        let now = (self.clock)();
        for annotation in &self.annotations {
            if self.mounted.iter().any(|m| &m.annotation == annotation) {
                continue;
            }
            let Some(entry) = index.get(&annotation.field_path) else {
                continue;
            };
            let widget = Widget::for_annotation(annotation, entry, now);
            let handle = self.host.mount(annotation.offset, &widget);
            let id = self.next_widget_id;
            self.next_widget_id += 1;
            self.mounted.push(MountedWidget { id, annotation: annotation.clone(), widget, handle });
        }
        self.mounted.sort_by_key(|m| m.annotation.offset);
        trace!(widgets = self.mounted.len(), "widgets reconciled");
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
