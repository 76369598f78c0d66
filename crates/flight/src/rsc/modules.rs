use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::FlightError;
use crate::rsc::thenable::Resolution;
use crate::rsc::types::Model;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    pub id: String,
    pub path: String,
    pub exports: SmallVec<[String; 3]>,
}

impl ModuleReference {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self { id: id.into(), path: path.into(), exports: SmallVec::new() }
    }

    pub fn with_export(mut self, export: impl Into<String>) -> Self {
        self.exports.push(export.into());
        self
    }
}

/// Maps module references to the metadata a client needs to load them.
pub trait BundlerConfig {
    fn resolve_module_meta_data(&self, reference: &ModuleReference) -> Result<Value, FlightError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetaData {
    pub id: String,
    pub chunks: Vec<String>,
    pub name: String,
}

/// Manifest-backed bundler config.
#[derive(Debug, Clone, Default)]
pub struct ModuleMap {
    entries: FxHashMap<String, ModuleMetaData>,
    chunk_counter: u32,
}

impl ModuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module_id: &str, file_path: &str, export_name: &str) {
        self.chunk_counter += 1;
        let chunk_name = format!("client{}", self.chunk_counter);

        self.entries.insert(
            module_id.to_string(),
            ModuleMetaData {
                id: file_path.to_string(),
                chunks: vec![chunk_name],
                name: export_name.to_string(),
            },
        );
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.entries.contains_key(module_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BundlerConfig for ModuleMap {
    fn resolve_module_meta_data(&self, reference: &ModuleReference) -> Result<Value, FlightError> {
        let entry = self.entries.get(&reference.id).ok_or_else(|| {
            FlightError::module_resolution(format!(
                "Could not find the module \"{}\" in the bundler manifest.",
                reference.id
            ))
        })?;

        let mut meta = entry.clone();
        if let Some(export) = reference.exports.first() {
            meta.name = export.clone();
        }

        Ok(serde_json::to_value(meta)?)
    }
}

pub type LoadFn = Rc<dyn Fn() -> Resolution<Model>>;

/// A module reference paired with the data its client half is rendered with.
#[derive(Clone)]
pub struct ServerBlock {
    module: ModuleReference,
    load: LoadFn,
}

impl ServerBlock {
    pub fn new(module: ModuleReference, load: impl Fn() -> Resolution<Model> + 'static) -> Self {
        Self { module, load: Rc::new(load) }
    }

    pub fn module(&self) -> &ModuleReference {
        &self.module
    }

    pub fn loader(&self) -> LoadFn {
        Rc::clone(&self.load)
    }

    pub fn load(&self) -> Resolution<Model> {
        (self.load)()
    }
}

impl fmt::Debug for ServerBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBlock").field("module", &self.module).finish_non_exhaustive()
    }
}
