use std::borrow::Cow;
use std::rc::Rc;

use serde_json::{Map, Number, Value};

use crate::error::FlightError;
use crate::rsc::diagnostics::Diagnostics;
use crate::rsc::modules::{ModuleReference, ServerBlock};
use crate::rsc::rendering::streaming::segment::SegmentQuery;
use crate::rsc::resolver::resolve_element;
use crate::rsc::thenable::{Resolution, Thenable};
use crate::rsc::types::{Callable, Instance, Marker, Model};

use super::chunk::ChunkId;
use super::describe::{Parent, describe_key, describe_object};
use super::escape::{ELEMENT_MARKER, SERVER_BLOCK_MARKER, escape_string};

pub mod tests;

/// What the serializer needs from the request that owns it.
pub trait SerializationContext {
    /// Defers `query` to a new segment that is retried once `thenable` settles.
    fn suspend(&self, query: SegmentQuery, thenable: Rc<dyn Thenable>) -> ChunkId;

    /// Emits `error` as its own row under a freshly allocated id.
    fn emit_error(&self, error: &FlightError) -> ChunkId;

    fn resolve_module_meta_data(&self, reference: &ModuleReference) -> Result<Value, FlightError>;

    fn strict_checks(&self) -> bool;

    fn diagnostics(&self) -> &dyn Diagnostics;
}

const BUILT_IN_CLASSES: &[&str] = &[
    "Date",
    "Map",
    "Set",
    "RegExp",
    "Error",
    "Promise",
    "WeakMap",
    "WeakSet",
    "ArrayBuffer",
    "Uint8Array",
];

pub struct ModelSerializer<'a> {
    context: &'a dyn SerializationContext,
}

impl<'a> ModelSerializer<'a> {
    pub fn new(context: &'a dyn SerializationContext) -> Self {
        Self { context }
    }

    pub fn serialize(&self, model: &Model) -> Result<String, FlightError> {
        let value = self.resolve_model_to_json(Parent::Root(model), "", model)?;
        Ok(serde_json::to_string(&value.unwrap_or(Value::Null))?)
    }

    /// Converts the value found at `key` of `parent`. `None` means the value is undefined and
    /// the caller decides whether to drop it or write `null`.
    pub fn resolve_model_to_json(
        &self,
        parent: Parent<'_>,
        key: &str,
        value: &Model,
    ) -> Result<Option<Value>, FlightError> {
        let mut current = Cow::Borrowed(value);
        let mut custom_applied = false;
        loop {
            let next = match current.as_ref() {
                Model::Custom(custom) if custom_applied => {
                    return Err(FlightError::not_serializable(format!(
                        "Only plain objects can be passed to client components from server \
                         components. {} converted into another object with a toJSON method. \
                         Remove {} from these props: {}",
                        custom.type_name(),
                        describe_key(key),
                        describe_object(parent, None)
                    )));
                }
                Model::Custom(custom) => {
                    if self.context.strict_checks() {
                        self.context.diagnostics().warn(&format!(
                            "Only plain objects can be passed to client components from server \
                             components. Objects with toJSON methods are not supported. Convert it \
                             manually to a simple value before passing it to props. Remove {} from \
                             these props: {}",
                            describe_key(key),
                            describe_object(parent, None)
                        ));
                    }
                    custom_applied = true;
                    custom.to_model()
                }
                Model::Element(element) => {
                    let element = Rc::clone(element);
                    match resolve_element(&element) {
                        Resolution::Ready(next) => next,
                        Resolution::Suspended(thenable) => {
                            let id = self
                                .context
                                .suspend(SegmentQuery::Model(Model::Element(element)), thenable);
                            return Ok(Some(Value::String(id.reference())));
                        }
                        Resolution::Failed(error) => return Err(error),
                    }
                }
                resolved => return self.serialize_resolved(parent, key, resolved),
            };
            current = Cow::Owned(next);
        }
    }

    fn serialize_resolved(
        &self,
        parent: Parent<'_>,
        key: &str,
        value: &Model,
    ) -> Result<Option<Value>, FlightError> {
        match value {
            Model::Undefined => Ok(None),
            Model::Null => Ok(Some(Value::Null)),
            Model::Bool(value) => Ok(Some(Value::Bool(*value))),
            Model::Number(value) => Ok(Some(number_value(*value))),
            Model::String(value) => Ok(Some(Value::String(escape_string(value).into_owned()))),
            Model::Marker(Marker::Element) => Ok(Some(Value::String(ELEMENT_MARKER.to_string()))),
            Model::Marker(Marker::ServerBlock) => {
                Ok(Some(Value::String(SERVER_BLOCK_MARKER.to_string())))
            }
            Model::Marker(Marker::Lazy | Marker::Block) => Err(FlightError::UnsupportedBlock),
            Model::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let json =
                        self.resolve_model_to_json(Parent::Array(items), &index.to_string(), item)?;
                    out.push(json.unwrap_or(Value::Null));
                }
                Ok(Some(Value::Array(out)))
            }
            Model::Record(record) => {
                let mut out = Map::new();
                for (field, item) in record.iter() {
                    if let Some(json) =
                        self.resolve_model_to_json(Parent::Record(record), field, item)?
                    {
                        out.insert(field.to_string(), json);
                    }
                }
                Ok(Some(Value::Object(out)))
            }
            Model::ServerBlock(block) => self.serialize_server_block(block).map(Some),
            Model::Function(callable) => Err(function_error(parent, key, callable)),
            Model::Symbol(description) => Err(FlightError::not_serializable(format!(
                "Symbol values ({}) cannot be passed to client components. \
                 Remove {} from this object, or avoid the entire object: {}",
                description.as_deref().unwrap_or(""),
                describe_key(key),
                describe_object(parent, None)
            ))),
            Model::BigInt(value) => Err(FlightError::not_serializable(format!(
                "BigInt ({value}) is not yet supported in client component props. \
                 Remove {} from this object or use a plain number instead: {}",
                describe_key(key),
                describe_object(parent, None)
            ))),
            Model::Instance(instance) => Err(instance_error(parent, key, instance)),
            Model::Custom(_) | Model::Element(_) => self.resolve_model_to_json(parent, key, value),
        }
    }

    /// Blocks encode as `["@", <module metadata>, <loaded data>]`.
    fn serialize_server_block(&self, block: &ServerBlock) -> Result<Value, FlightError> {
        let module = match self.context.resolve_module_meta_data(block.module()) {
            Ok(meta) => {
                let meta = Model::from(meta);
                self.resolve_model_to_json(Parent::Root(&meta), "1", &meta)?.unwrap_or(Value::Null)
            }
            Err(error) => Value::String(self.context.emit_error(&error).reference()),
        };

        let data = match block.load() {
            Resolution::Ready(model) => self
                .resolve_model_to_json(Parent::Root(&model), "2", &model)?
                .unwrap_or(Value::Null),
            Resolution::Suspended(thenable) => {
                let id = self.context.suspend(SegmentQuery::Load(block.loader()), thenable);
                Value::String(id.reference())
            }
            Resolution::Failed(error) => Value::String(self.context.emit_error(&error).reference()),
        };

        Ok(Value::Array(vec![Value::String(SERVER_BLOCK_MARKER.to_string()), module, data]))
    }
}

fn number_value(value: f64) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }
    // Integral values print without a fraction for as long as an integer can hold them.
    if value.fract() == 0.0 {
        if value.abs() < 9_223_372_036_854_775_808.0 {
            return Value::Number(Number::from(value as i64));
        }
        if value > 0.0 && value < 18_446_744_073_709_551_616.0 {
            return Value::Number(Number::from(value as u64));
        }
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

fn is_event_handler(key: &str) -> bool {
    key.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

fn function_error(parent: Parent<'_>, key: &str, callable: &Callable) -> FlightError {
    if is_event_handler(key) {
        FlightError::not_serializable(format!(
            "Event handlers cannot be passed to client component props. \
             Remove {} from these props if possible: {}\n\
             If you need interactivity, consider converting part of this to a client component.",
            describe_key(key),
            describe_object(parent, None)
        ))
    } else {
        FlightError::not_serializable(format!(
            "Functions cannot be passed directly to client components because they're not \
             serializable. Remove {} ({}) from this object, or avoid the entire object: {}",
            describe_key(key),
            callable.name().unwrap_or("function"),
            describe_object(parent, None)
        ))
    }
}

fn instance_error(parent: Parent<'_>, key: &str, instance: &Instance) -> FlightError {
    if BUILT_IN_CLASSES.contains(&instance.class_name.as_str()) {
        FlightError::not_serializable(format!(
            "Only plain objects can be passed to client components from server components. \
             Built-ins like {} are not supported. Remove {} from these props: {}",
            instance.class_name,
            describe_key(key),
            describe_object(parent, None)
        ))
    } else {
        FlightError::not_serializable(format!(
            "Only plain objects can be passed to client components from server components. \
             Classes or other objects with methods are not supported. \
             Remove {} from these props: {}",
            describe_key(key),
            describe_object(parent, Some(key))
        ))
    }
}
