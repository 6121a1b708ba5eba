// Inline widgets mounted at annotation offsets.
//
// The host editor implements `WidgetHost`; everything here works on offsets
// and field paths only. Read-write widgets write back by replacing the value
// of the last `"<key>": "..."` member in the buffer, whatever its path.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Timelike, Utc};
use regex::Regex;
use rpcdesk_common::schema::{EnumValueInfo, FieldEntry};
use serde::Serialize;

use super::annotator::{Annotation, WidgetKind};

/// Capability implemented by the rendering host.
pub trait WidgetHost {
    type Handle;

    /// Materialize `widget` at byte `offset` of the buffer.
    fn mount(&mut self, offset: usize, widget: &Widget) -> Self::Handle;

    fn unmount(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Enum(EnumWidget),
    Timestamp(TimestampWidget),
    Duration(DurationWindow),
}

impl Widget {
    /// Build the widget for an annotation. `now` seeds the timestamp picker.
    pub fn for_annotation(annotation: &Annotation, entry: &FieldEntry, now: DateTime<Utc>) -> Self {
        let path = annotation.field_path.clone();
        match annotation.kind {
            WidgetKind::Enum => Self::Enum(EnumWidget { field_path: path, values: entry.enum_values.clone() }),
            WidgetKind::Timestamp => Self::Timestamp(TimestampWidget::new(path, now)),
            WidgetKind::Duration => Self::Duration(DurationWindow::new(path)),
        }
    }

    pub fn kind(&self) -> WidgetKind {
        match self {
            Self::Enum(_) => WidgetKind::Enum,
            Self::Timestamp(_) => WidgetKind::Timestamp,
            Self::Duration(_) => WidgetKind::Duration,
        }
    }

    pub fn field_path(&self) -> &str {
        match self {
            Self::Enum(widget) => &widget.field_path,
            Self::Timestamp(widget) => &widget.field_path,
            Self::Duration(widget) => &widget.field_path,
        }
    }

    /// Text after applying this widget's value, or `None` for read-only
    /// widgets and buffers without a matching member.
    pub fn apply(&self, text: &str) -> Option<String> {
        match self {
            Self::Enum(_) => None,
            Self::Timestamp(widget) => widget.apply(text),
            Self::Duration(widget) => widget.apply(text),
        }
    }
}

// ── Enum ───────────────────────────────────────────────────────────

/// Read-only listing of an enum's members.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumWidget {
    pub field_path: String,
    pub values: Vec<EnumValueInfo>,
}

impl EnumWidget {
    /// One `NAME = number` line per member.
    pub fn lines(&self) -> Vec<String> {
        self.values.iter().map(|value| format!("{} = {}", value.name, value.number)).collect()
    }
}

// ── Timestamp ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampWidget {
    pub field_path: String,
    selected: DateTime<Utc>,
}

impl TimestampWidget {
    /// Picker seeded from `now`, truncated to the minute like a
    /// `datetime-local` input.
    pub fn new(field_path: impl Into<String>, now: DateTime<Utc>) -> Self {
        let selected = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);
        Self { field_path: field_path.into(), selected }
    }

    pub fn selected(&self) -> DateTime<Utc> {
        self.selected
    }

    pub fn select(&mut self, at: DateTime<Utc>) {
        self.selected = at;
    }

    /// Accept `YYYY-MM-DDTHH:MM` (or with seconds) as typed in a picker.
    /// Returns false and keeps the previous selection on bad input.
    pub fn select_input(&mut self, input: &str) -> bool {
        let parsed = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S"));
        match parsed {
            Ok(naive) => {
                self.selected = naive.and_utc();
                true
            }
            Err(_) => false,
        }
    }

    /// RFC 3339 with millisecond precision, e.g. `2024-03-01T12:30:00.000Z`.
    pub fn value(&self) -> String {
        self.selected.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn apply(&self, text: &str) -> Option<String> {
        replace_last_member(text, leaf_name(&self.field_path), &self.value())
    }
}

// ── Duration ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum DurationUnit {
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
}

impl DurationUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
        }
    }
}

/// Quick-pick presets: label, magnitude and unit.
pub const DURATION_PRESETS: &[(&str, &str, DurationUnit)] = &[
    ("100ms", "0.1", DurationUnit::Seconds),
    ("1s", "1", DurationUnit::Seconds),
    ("5s", "5", DurationUnit::Seconds),
    ("30s", "30", DurationUnit::Seconds),
    ("1m", "60", DurationUnit::Seconds),
    ("5m", "300", DurationUnit::Seconds),
    ("1h", "3600", DurationUnit::Seconds),
];

#[derive(Debug, Clone, PartialEq)]
pub struct DurationWindow {
    pub field_path: String,
    magnitude: String,
    unit: DurationUnit,
}

impl DurationWindow {
    pub fn new(field_path: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), magnitude: "1".to_string(), unit: DurationUnit::Seconds }
    }

    pub fn set_magnitude(&mut self, magnitude: impl Into<String>) {
        self.magnitude = magnitude.into();
    }

    pub fn set_unit(&mut self, unit: DurationUnit) {
        self.unit = unit;
    }

    pub fn unit(&self) -> DurationUnit {
        self.unit
    }

    /// Select a preset by label. Unknown labels leave the window unchanged.
    pub fn choose_preset(&mut self, label: &str) -> bool {
        let Some((_, magnitude, unit)) = DURATION_PRESETS.iter().find(|(name, _, _)| *name == label) else {
            return false;
        };
        self.magnitude = (*magnitude).to_string();
        self.unit = *unit;
        true
    }

    /// `<number><unit>`; a magnitude that is not a number formats as `0s`.
    pub fn value(&self) -> String {
        match self.magnitude.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => format!("{number}{}", self.unit.suffix()),
            _ => "0s".to_string(),
        }
    }

    pub fn apply(&self, text: &str) -> Option<String> {
        replace_last_member(text, leaf_name(&self.field_path), &self.value())
    }
}

// ── Write-back ─────────────────────────────────────────────────────

fn leaf_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Replace the value of the last `"<key>": "<string>"` member in `text`.
/// Both key and value are matched and written in JSON-escaped form.
pub fn replace_last_member(text: &str, key: &str, value: &str) -> Option<String> {
    let quoted_key = serde_json::to_string(key).ok()?;
    let quoted_value = serde_json::to_string(value).ok()?;
    let pattern = format!(r#"{}\s*:\s*"(?:[^"\\]|\\.)*""#, regex::escape(&quoted_key));
    let re = Regex::new(&pattern).ok()?;
    let found = re.find_iter(text).last()?;

    let mut out = String::with_capacity(text.len() + quoted_value.len());
    out.push_str(&text[..found.start()]);
    out.push_str(&quoted_key);
    out.push_str(": ");
    out.push_str(&quoted_value);
    out.push_str(&text[found.end()..]);
    Some(out)
}
