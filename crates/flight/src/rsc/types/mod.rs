use std::fmt;
use std::rc::Rc;

use serde_json::Value as JsonValue;

use crate::rsc::modules::ServerBlock;

pub mod elements;

pub use elements::{Component, Element, ForwardRef, Renderable};

/// A value being rendered: primitives, containers, or element descriptions still awaiting
/// resolution.
#[derive(Clone, Default)]
pub enum Model {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    BigInt(i128),
    Symbol(Option<String>),
    Function(Callable),
    Array(Vec<Model>),
    Record(Record),
    Instance(Instance),
    Element(Rc<Element>),
    ServerBlock(Rc<ServerBlock>),
    Marker(Marker),
    Custom(Rc<dyn ToModel>),
}

/// Process-wide sentinels that have a fixed wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Element,
    ServerBlock,
    Lazy,
    Block,
}

impl Marker {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Element => "react.element",
            Self::ServerBlock => "react.server.block",
            Self::Lazy => "react.lazy",
            Self::Block => "react.block",
        }
    }
}

/// Values that substitute their own model before serialization, like an object with `toJSON`.
pub trait ToModel {
    fn to_model(&self) -> Model;

    fn type_name(&self) -> &str {
        "Object"
    }
}

#[derive(Clone)]
pub struct Callable {
    name: Option<String>,
    func: Rc<dyn Fn(&[Model]) -> Model>,
}

impl Callable {
    pub fn new(name: Option<String>, func: impl Fn(&[Model]) -> Model + 'static) -> Self {
        Self { name, func: Rc::new(func) }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn call(&self, args: &[Model]) -> Model {
        (self.func)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable").field("name", &self.name).finish_non_exhaustive()
    }
}

/// An object whose prototype is not the plain object prototype.
#[derive(Debug, Clone)]
pub struct Instance {
    pub class_name: String,
    pub fields: Record,
}

/// String-keyed mapping that keeps insertion order.
#[derive(Debug, Clone, Default)]
pub struct Record {
    entries: Vec<(String, Model)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Model>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Model>) -> Option<Model> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Model> {
        self.entries.iter().find(|(existing, _)| existing == key).map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Model)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Model)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Model)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Model {
    pub fn array(items: impl IntoIterator<Item = Model>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    pub fn function(name: &str, func: impl Fn(&[Model]) -> Model + 'static) -> Self {
        let name = if name.is_empty() { None } else { Some(name.to_string()) };
        Self::Function(Callable::new(name, func))
    }

    pub fn instance(class_name: impl Into<String>, fields: Record) -> Self {
        Self::Instance(Instance { class_name: class_name.into(), fields })
    }

    pub fn custom(value: impl ToModel + 'static) -> Self {
        Self::Custom(Rc::new(value))
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::BigInt(_) => "bigint",
            Self::Symbol(_) | Self::Marker(_) => "symbol",
            Self::Function(_) => "function",
            Self::Array(_)
            | Self::Record(_)
            | Self::Instance(_)
            | Self::Element(_)
            | Self::ServerBlock(_)
            | Self::Custom(_) => "object",
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Number(value) => f.debug_tuple("Number").field(value).finish(),
            Self::String(value) => f.debug_tuple("String").field(value).finish(),
            Self::BigInt(value) => f.debug_tuple("BigInt").field(value).finish(),
            Self::Symbol(value) => f.debug_tuple("Symbol").field(value).finish(),
            Self::Function(value) => f.debug_tuple("Function").field(value).finish(),
            Self::Array(value) => f.debug_tuple("Array").field(value).finish(),
            Self::Record(value) => f.debug_tuple("Record").field(value).finish(),
            Self::Instance(value) => f.debug_tuple("Instance").field(value).finish(),
            Self::Element(value) => f.debug_tuple("Element").field(value).finish(),
            Self::ServerBlock(value) => f.debug_tuple("ServerBlock").field(value).finish(),
            Self::Marker(value) => f.debug_tuple("Marker").field(value).finish(),
            Self::Custom(value) => f.debug_tuple("Custom").field(&value.type_name()).finish(),
        }
    }
}

impl From<bool> for Model {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Model {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Model {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for Model {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Model {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Model {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Model>> for Model {
    fn from(value: Vec<Model>) -> Self {
        Self::Array(value)
    }
}

impl From<Record> for Model {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<Element> for Model {
    fn from(value: Element) -> Self {
        Self::Element(Rc::new(value))
    }
}

impl From<ServerBlock> for Model {
    fn from(value: ServerBlock) -> Self {
        Self::ServerBlock(Rc::new(value))
    }
}

impl<T: Into<Model>> From<Option<T>> for Model {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<JsonValue> for Model {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(value) => Self::Bool(value),
            JsonValue::Number(number) => Self::Number(number.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(value) => Self::String(value),
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Model::from).collect()),
            JsonValue::Object(map) => Self::Record(
                map.into_iter().map(|(key, value)| (key, Model::from(value))).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_preserves_insertion_order() {
        let record = Record::new().with("b", 1).with("a", 2).with("c", 3);
        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut record = Record::new().with("a", 1).with("b", 2);
        let previous = record.insert("a", "replaced");

        assert!(matches!(previous, Some(Model::Number(n)) if n == 1.0));
        assert_eq!(record.len(), 2);
        assert_eq!(record.keys().next(), Some("a"));
        assert!(matches!(record.get("a"), Some(Model::String(s)) if s == "replaced"));
    }

    #[test]
    fn test_model_from_json() {
        let model = Model::from(json!({"title": "Hello", "tags": ["a", null], "count": 3}));

        let Model::Record(record) = model else { panic!("Expected record") };
        assert!(matches!(record.get("title"), Some(Model::String(s)) if s == "Hello"));
        assert!(matches!(record.get("count"), Some(Model::Number(n)) if *n == 3.0));
        match record.get("tags") {
            Some(Model::Array(items)) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[1], Model::Null));
            }
            other => panic!("Expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_callable_invocation() {
        let double = Model::function("double", |args| match args.first() {
            Some(Model::Number(n)) => Model::Number(n * 2.0),
            _ => Model::Undefined,
        });

        let Model::Function(callable) = double else { panic!("Expected function") };
        assert_eq!(callable.name(), Some("double"));
        assert!(matches!(callable.call(&[Model::from(21)]), Model::Number(n) if n == 42.0));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Model::Undefined.type_name(), "undefined");
        assert_eq!(Model::BigInt(1).type_name(), "bigint");
        assert_eq!(Model::Marker(Marker::Lazy).type_name(), "symbol");
        assert_eq!(Model::from(Record::new()).type_name(), "object");
    }
}
