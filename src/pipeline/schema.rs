//! Closed category set and the extraction schema bound to each category.
//!
//! Dispatch is an exhaustive `match` on [`Category`]; adding a category means
//! the compiler points at every place that needs a schema or template.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Category ────────────────────────────────────────────────────────

/// Email category. `Other` is the fallback for anything unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "invoice/bill")]
    InvoiceBill,
    #[serde(rename = "shipping/order")]
    ShippingOrder,
    #[serde(rename = "calendar_invite")]
    CalendarInvite,
    #[serde(rename = "newsletter")]
    Newsletter,
    #[serde(rename = "other")]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Self::InvoiceBill,
        Self::ShippingOrder,
        Self::CalendarInvite,
        Self::Newsletter,
        Self::Other,
    ];

    /// Wire label, as written to the results log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvoiceBill => "invoice/bill",
            Self::ShippingOrder => "shipping/order",
            Self::CalendarInvite => "calendar_invite",
            Self::Newsletter => "newsletter",
            Self::Other => "other",
        }
    }

    /// Match a model-supplied label. Case and surrounding whitespace are
    /// ignored, and a few common aliases are accepted.
    pub fn from_label(raw: &str) -> Option<Self> {
        let label = raw.trim().to_lowercase();
        match label.as_str() {
            "invoice/bill" | "invoice" | "bill" | "invoice_bill" => Some(Self::InvoiceBill),
            "shipping/order" | "shipping" | "order" | "shipping_order" => {
                Some(Self::ShippingOrder)
            }
            "calendar_invite" | "calendar invite" | "calendar" | "calendar-invite" => {
                Some(Self::CalendarInvite)
            }
            "newsletter" => Some(Self::Newsletter),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Like [`Category::from_label`], resolving unknown labels to `Other`.
    pub fn from_label_or_other(raw: &str) -> Self {
        Self::from_label(raw).unwrap_or(Self::Other)
    }

    /// The extraction schema for this category.
    pub fn schema(&self) -> &'static ExtractionSchema {
        match self {
            Self::InvoiceBill => &INVOICE_SCHEMA,
            Self::ShippingOrder => &SHIPPING_SCHEMA,
            Self::CalendarInvite => &CALENDAR_SCHEMA,
            Self::Newsletter => &NEWSLETTER_SCHEMA,
            Self::Other => &OTHER_SCHEMA,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Extraction schema ───────────────────────────────────────────────

/// JSON type expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, copied as written in the email.
    Text,
    /// A date string, kept in the email's own format.
    Date,
    /// A JSON number.
    Number,
    /// Array of objects, each with the given fields.
    List(&'static [FieldSpec]),
}

/// A required field of an extraction schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Named set of required fields for one category.
#[derive(Debug, PartialEq, Eq)]
pub struct ExtractionSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

macro_rules! fields {
    ($($name:literal => $kind:expr),* $(,)?) => {
        &[$(FieldSpec { name: $name, kind: $kind }),*]
    };
}

const SHIPPING_ITEM_FIELDS: &[FieldSpec] = fields![
    "name" => FieldKind::Text,
    "quantity" => FieldKind::Number,
];

static INVOICE_SCHEMA: ExtractionSchema = ExtractionSchema {
    name: "invoice",
    fields: fields![
        "vendor" => FieldKind::Text,
        "invoice_total" => FieldKind::Text,
        "invoice_date" => FieldKind::Date,
    ],
};

static SHIPPING_SCHEMA: ExtractionSchema = ExtractionSchema {
    name: "shipping",
    fields: fields![
        "order_id" => FieldKind::Text,
        "ship_date" => FieldKind::Date,
        "carrier" => FieldKind::Text,
        "items" => FieldKind::List(SHIPPING_ITEM_FIELDS),
    ],
};

static CALENDAR_SCHEMA: ExtractionSchema = ExtractionSchema {
    name: "calendar_invite",
    fields: fields![
        "event_title" => FieldKind::Text,
        "event_date" => FieldKind::Date,
        "organizer" => FieldKind::Text,
    ],
};

static NEWSLETTER_SCHEMA: ExtractionSchema = ExtractionSchema {
    name: "newsletter",
    fields: fields![
        "newsletter_name" => FieldKind::Text,
        "topic" => FieldKind::Text,
        "date" => FieldKind::Date,
    ],
};

static OTHER_SCHEMA: ExtractionSchema = ExtractionSchema {
    name: "other",
    fields: fields!["summary" => FieldKind::Text],
};

/// A structural problem found by [`ExtractionSchema::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// Required field absent or null. `path` is dotted, e.g. `items[0].name`.
    Missing { path: String },
    /// Field present with the wrong JSON type.
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "missing {path}"),
            Self::WrongType {
                path,
                expected,
                found,
            } => write!(f, "{path}: expected {expected}, found {found}"),
        }
    }
}

impl ExtractionSchema {
    /// Render the JSON skeleton shown to the model, fields in schema order.
    ///
    /// `{"vendor":"", "invoice_total":"", "invoice_date":""}`
    pub fn skeleton(&self) -> String {
        render_fields(self.fields)
    }

    /// Check a payload's shape. Extra keys are allowed.
    pub fn check(&self, payload: &serde_json::Map<String, Value>) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();
        check_fields(self.fields, payload, "", &mut violations);
        violations
    }
}

fn render_fields(fields: &[FieldSpec]) -> String {
    let parts: Vec<String> = fields
        .iter()
        .map(|f| {
            let value = match f.kind {
                FieldKind::Text | FieldKind::Date => "\"\"".to_string(),
                FieldKind::Number => "0".to_string(),
                FieldKind::List(inner) => format!("[{}]", render_fields(inner)),
            };
            format!("\"{}\":{}", f.name, value)
        })
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_fields(
    fields: &[FieldSpec],
    object: &serde_json::Map<String, Value>,
    prefix: &str,
    out: &mut Vec<SchemaViolation>,
) {
    for spec in fields {
        let path = format!("{prefix}{}", spec.name);
        let value = match object.get(spec.name) {
            None | Some(Value::Null) => {
                out.push(SchemaViolation::Missing { path });
                continue;
            }
            Some(v) => v,
        };

        let expected = match spec.kind {
            FieldKind::Text | FieldKind::Date if value.is_string() => continue,
            FieldKind::Text | FieldKind::Date => "string",
            FieldKind::Number if value.is_number() => continue,
            FieldKind::Number => "number",
            FieldKind::List(inner) => {
                let Some(items) = value.as_array() else {
                    out.push(SchemaViolation::WrongType {
                        path,
                        expected: "array",
                        found: json_type_name(value),
                    });
                    continue;
                };
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{i}]");
                    match item.as_object() {
                        Some(obj) => check_fields(inner, obj, &format!("{item_path}."), out),
                        None => out.push(SchemaViolation::WrongType {
                            path: item_path,
                            expected: "object",
                            found: json_type_name(item),
                        }),
                    }
                }
                continue;
            }
        };

        out.push(SchemaViolation::WrongType {
            path,
            expected,
            found: json_type_name(value),
        });
    }
}
