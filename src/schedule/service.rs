//! Service entries and the payload normalizer.
//!
//! Decoded JSON arrives in one of four shapes (an object with a `services`
//! array, an object with a singular `service`, a bare entry object, or a bare
//! array of entries). [`extract_services`] flattens any of them into a
//! deduplicated list of [`Service`] values whose fields are never empty.

#![allow(missing_docs)]

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One departure: scheduled time, destination, status, calling points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Service {
    pub scheduled: String,
    pub destination: String,
    pub status: String,
    pub calling: String,
}

/// Outcome of reading one field from an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A usable, trimmed, non-empty value.
    Given(String),
    /// Missing, blank, or not coercible to text; the configured default applies.
    Default,
}

impl FieldValue {
    /// Resolve against the per-field default.
    #[must_use]
    pub fn or_default(self, default: &str) -> String {
        match self {
            Self::Given(text) => text,
            Self::Default => default.to_string(),
        }
    }

    /// Fall through to `other` when this value is [`FieldValue::Default`].
    #[must_use]
    pub fn or_else(self, other: impl FnOnce() -> Self) -> Self {
        match self {
            Self::Given(_) => self,
            Self::Default => other(),
        }
    }
}

/// Coerce a scalar JSON value to trimmed text.
#[must_use]
pub fn coerce_text(value: Option<&Value>) -> FieldValue {
    let text = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        // false, null, arrays and objects carry no displayable text.
        _ => String::new(),
    };
    if text.is_empty() {
        FieldValue::Default
    } else {
        FieldValue::Given(text)
    }
}

/// Calling points: a string, or a sequence joined with `", "` after dropping blanks.
#[must_use]
pub fn coerce_calling(value: Option<&Value>) -> FieldValue {
    match value {
        Some(Value::Array(items)) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match coerce_text(Some(item)) {
                    FieldValue::Given(text) => Some(text),
                    FieldValue::Default => None,
                })
                .collect();
            if parts.is_empty() {
                FieldValue::Default
            } else {
                FieldValue::Given(parts.join(", "))
            }
        }
        other => coerce_text(other),
    }
}

/// Normalize one entry. Non-objects yield `None` and are skipped by callers.
#[must_use]
pub fn normalize_entry(entry: &Value, defaults: &Service) -> Option<Service> {
    let obj = entry.as_object()?;
    let scheduled =
        coerce_text(obj.get("sched")).or_else(|| coerce_text(obj.get("scheduled")));
    Some(Service {
        scheduled: scheduled.or_default(&defaults.scheduled),
        destination: coerce_text(obj.get("destination")).or_default(&defaults.destination),
        status: coerce_text(obj.get("status")).or_default(&defaults.status),
        calling: coerce_calling(obj.get("calling")).or_default(&defaults.calling),
    })
}

/// Flatten any supported payload shape into distinct services, input order kept.
#[must_use]
pub fn extract_services(payload: &Value, defaults: &Service) -> Vec<Service> {
    let candidates: Vec<&Value> = match payload {
        Value::Object(obj) => match obj.get("services") {
            Some(Value::Array(list)) => list.iter().collect(),
            _ => match obj.get("service") {
                Some(single) => vec![single],
                None => vec![payload],
            },
        },
        Value::Array(list) => list.iter().collect(),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    let mut services = Vec::new();
    for candidate in candidates {
        if let Some(service) = normalize_entry(candidate, defaults)
            && seen.insert(service.clone())
        {
            services.push(service);
        }
    }
    services
}
