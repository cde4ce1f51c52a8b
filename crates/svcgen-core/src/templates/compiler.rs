//! Template compilation and rendering

use crate::error::EntryError;
use crate::templates::helpers;
use handlebars::Handlebars;
use serde::Serialize;

/// Compiled templates keyed by their original (suffixed) path
///
/// Output is plain text, so HTML escaping is disabled.
pub struct TemplateCompiler {
    registry: Handlebars<'static>,
}

impl Default for TemplateCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCompiler {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        helpers::register(&mut registry);
        Self { registry }
    }

    /// Parse `raw` and keep it under `path`
    pub fn compile(&mut self, path: &str, raw: &[u8]) -> Result<(), EntryError> {
        let source = std::str::from_utf8(raw).map_err(|e| EntryError::Compile {
            path: path.to_string(),
            message: format!("template is not valid UTF-8: {}", e),
        })?;

        self.registry
            .register_template_string(path, source)
            .map_err(|e| EntryError::Compile {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    pub fn is_compiled(&self, path: &str) -> bool {
        self.registry.has_template(path)
    }

    /// Number of compiled templates
    pub fn len(&self) -> usize {
        self.registry.get_templates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render a compiled template with `context`
    pub fn render<T: Serialize>(&self, path: &str, context: &T) -> Result<String, EntryError> {
        self.registry
            .render(path, context)
            .map_err(|e| EntryError::Render {
                path: path.to_string(),
                message: e.to_string(),
            })
    }
}
