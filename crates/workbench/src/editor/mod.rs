// Schema-aware request body editing: annotation, inline widgets, completion.

pub mod annotator;
pub mod completion;
pub mod surface;
pub mod widgets;

pub use annotator::{annotate, Annotation, WidgetKind};
pub use completion::{complete, CompletionContext, CompletionItem, CompletionKind, CompletionList};
pub use surface::{EditorSurface, WidgetId};
pub use widgets::{DurationUnit, DurationWindow, EnumWidget, TimestampWidget, Widget, WidgetHost};
