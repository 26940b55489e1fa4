use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::node::Node;
use crate::parser::ParseOptions;
use crate::value::Value;

/// Named canonical templates, typically one per file of a template directory.
///
/// Serializes as a JSON object mapping each name to its canonical tree, which
/// is the bundle another runtime loads to render the same templates.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TemplateSet {
    templates: BTreeMap<String, Node>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and canonicalize `source`, replacing any template of that name.
    pub fn insert_source(&mut self, name: &str, source: &str) -> Result<()> {
        self.insert_source_with(name, source, &ParseOptions::default())
    }

    pub fn insert_source_with(
        &mut self,
        name: &str,
        source: &str,
        options: &ParseOptions,
    ) -> Result<()> {
        let tree = crate::compile_with(source, options)
            .map_err(|err| Error::in_template(name, err))?;
        self.templates.insert(name.to_string(), tree);
        Ok(())
    }

    pub fn insert(&mut self, name: impl Into<String>, tree: Node) {
        self.templates.insert(name.into(), tree);
    }

    /// Load every `*.{extension}` file directly inside `dir`, keyed by file
    /// name. The first file that fails to load aborts the whole load.
    #[tracing::instrument(level = "debug", skip_all, fields(dir = %dir.as_ref().display(), extension = %extension))]
    pub fn load_dir(
        dir: impl AsRef<Path>,
        extension: &str,
        options: &ParseOptions,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let io_err = |source| Error::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut set = Self::new();
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::debug!(path = %path.display(), "skipping non-UTF-8 file name");
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
            set.insert_source_with(name, &source, options)?;
            tracing::debug!(name, "loaded template");
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.templates.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn render(&self, name: &str, data: &Value) -> Result<String> {
        let tree = self.get(name).ok_or_else(|| Error::UnknownTemplate {
            name: name.to_string(),
        })?;
        Ok(crate::eval::render(tree, data)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
