use std::collections::HashMap;
use std::sync::Arc;

use crate::formats::{builtin_formats, FormatDef};
use crate::providers::base::Model;
use crate::tool::Tool;

/// Resolves names to executable models, tools and output formats
///
/// Lookups must be free of side effects; the orchestrator resolves the same names on every turn.
pub trait ActionLookup: Send + Sync {
    fn lookup_model(&self, name: &str) -> Option<Arc<dyn Model>>;

    fn lookup_tool(&self, name: &str) -> Option<Arc<dyn Tool>>;

    fn lookup_format(&self, name: &str) -> Option<Arc<dyn FormatDef>>;

    /// The model used when a request does not name one
    fn default_model(&self) -> Option<&str> {
        None
    }
}

/// In-memory name registry
#[derive(Default, Clone)]
pub struct Registry {
    models: HashMap<String, Arc<dyn Model>>,
    tools: HashMap<String, Arc<dyn Tool>>,
    formats: HashMap<String, Arc<dyn FormatDef>>,
    default_model: Option<String>,
}

impl Registry {
    /// An empty registry with the built-in formats
    pub fn new() -> Self {
        let mut registry = Self::default();
        for format in builtin_formats() {
            registry.define_format(format);
        }
        registry
    }

    /// Register a model under its own name, replacing any previous one
    pub fn define_model(&mut self, model: Arc<dyn Model>) {
        self.models.insert(model.name().to_string(), model);
    }

    pub fn define_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn define_format(&mut self, format: Arc<dyn FormatDef>) {
        self.formats.insert(format.name().to_string(), format);
    }

    pub fn set_default_model<S: Into<String>>(&mut self, name: Option<S>) {
        self.default_model = name.map(Into::into);
    }

    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.define_model(model);
        self
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.define_tool(tool);
        self
    }

    pub fn with_format(mut self, format: Arc<dyn FormatDef>) -> Self {
        self.define_format(format);
        self
    }

    pub fn with_default_model<S: Into<String>>(mut self, name: Option<S>) -> Self {
        self.set_default_model(name);
        self
    }
}

impl ActionLookup for Registry {
    fn lookup_model(&self, name: &str) -> Option<Arc<dyn Model>> {
        self.models.get(name).cloned()
    }

    fn lookup_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    fn lookup_format(&self, name: &str) -> Option<Arc<dyn FormatDef>> {
        self.formats.get(name).cloned()
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }
}
