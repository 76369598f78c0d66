use crate::rsc::types::{Model, Record};

pub const MAX_PREVIEW_ENTRIES: usize = 6;
pub const MAX_STRING_PREVIEW: usize = 10;

/// The container a value was read from while serializing.
#[derive(Debug, Clone, Copy)]
pub enum Parent<'a> {
    Root(&'a Model),
    Array(&'a [Model]),
    Record(&'a Record),
}

pub fn describe_key(key: &str) -> String {
    let encoded = serde_json::to_string(key).unwrap_or_default();
    if encoded == format!("\"{key}\"") { key.to_string() } else { encoded }
}

pub fn describe_value(value: &Model) -> String {
    match value {
        Model::String(text) => {
            let preview = if text.chars().count() <= MAX_STRING_PREVIEW {
                text.clone()
            } else {
                format!("{}...", text.chars().take(MAX_STRING_PREVIEW).collect::<String>())
            };
            serde_json::to_string(&preview).unwrap_or_default()
        }
        Model::Array(_) | Model::ServerBlock(_) => "[...]".to_string(),
        Model::Record(_) | Model::Element(_) => "{...}".to_string(),
        Model::Custom(custom) => match custom.type_name() {
            "Object" => "{...}".to_string(),
            name => name.to_string(),
        },
        Model::Instance(instance) => instance.class_name.clone(),
        Model::Function(_) => "function".to_string(),
        Model::Undefined => "undefined".to_string(),
        Model::Null => "null".to_string(),
        Model::Bool(value) => value.to_string(),
        Model::Number(value) => format_number(*value),
        Model::BigInt(value) => value.to_string(),
        Model::Symbol(description) => format!("Symbol({})", description.as_deref().unwrap_or("")),
        Model::Marker(marker) => format!("Symbol({})", marker.description()),
    }
}

pub fn describe_object(parent: Parent<'_>, expanded: Option<&str>) -> String {
    match parent {
        Parent::Root(value) => match value {
            Model::Array(items) => describe_object(Parent::Array(items), expanded),
            Model::Record(record) => describe_object(Parent::Record(record), expanded),
            other => describe_value(other),
        },
        Parent::Array(items) => {
            let mut out = String::from("[");
            for (index, value) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                if index >= MAX_PREVIEW_ENTRIES {
                    out.push_str("...");
                    break;
                }
                let key = index.to_string();
                out.push_str(&describe_entry(value, expanded == Some(key.as_str())));
            }
            out.push(']');
            out
        }
        Parent::Record(record) => {
            let mut out = String::from("{");
            for (index, (key, value)) in record.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                if index >= MAX_PREVIEW_ENTRIES {
                    out.push_str("...");
                    break;
                }
                out.push_str(&describe_key(key));
                out.push_str(": ");
                out.push_str(&describe_entry(value, expanded == Some(key)));
            }
            out.push('}');
            out
        }
    }
}

fn describe_entry(value: &Model, expand: bool) -> String {
    match value {
        Model::Array(items) if expand => describe_object(Parent::Array(items), None),
        Model::Record(record) if expand => describe_object(Parent::Record(record), None),
        Model::Instance(instance) if expand => {
            describe_object(Parent::Record(&instance.fields), None)
        }
        other => describe_value(other),
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
