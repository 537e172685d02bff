//! Schema sources and the caching registry
//!
//! A [`SchemaSource`] knows where schema documents live; the
//! [`SchemaRegistry`] loads each named schema once, validates it and hands out
//! shared `Arc<ProtocolSchema>` handles from then on.

use super::decoder::{decode, DecodedFrame};
use super::schema::{ProtocolSchema, SchemaDocument};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result, ResultExt};
use crate::types::parse_hex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

/// Where schema documents are read from
pub trait SchemaSource: Send + Sync {
    /// Load and validate the schema called `name`
    ///
    /// Returns `SchemaNotFound` when the source has no entry for `name`.
    fn load(&self, name: &str) -> Result<ProtocolSchema>;

    /// Names of all schemas this source can provide
    fn names(&self) -> Result<Vec<String>>;
}

// ==================== Directory Source ====================

/// One `<name>.json` or `<name>.toml` document per protocol in a directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    /// Open a schema directory; the directory must exist
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(MonitorError::Config(format!(
                "Schema directory not found: {}",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn candidate(&self, name: &str) -> Option<PathBuf> {
        ["json", "toml"]
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", name, ext)))
            .find(|p| p.is_file())
    }
}

impl SchemaSource for DirectorySource {
    fn load(&self, name: &str) -> Result<ProtocolSchema> {
        let path = self
            .candidate(name)
            .ok_or_else(|| MonitorError::SchemaNotFound {
                name: name.to_string(),
            })?;

        let text = std::fs::read_to_string(&path)?;
        let parsed = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => ProtocolSchema::from_toml(name, &text),
            _ => ProtocolSchema::from_json(name, &text),
        };
        parsed.with_context(|| format!("Failed to load schema {}", path.display()))
    }

    fn names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_schema = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("toml")
            );
            if !is_schema {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }
}

// ==================== Bundle / Memory Sources ====================

/// All protocols in a single map of name -> document
///
/// This covers both a bundle file on disk and schemas assembled in memory.
/// A bundle is one JSON object whose values are complete schema documents,
/// each with its own `fields` list.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: BTreeMap<String, SchemaDocument>,
}

/// A bundle file is a memory source read from disk once
pub type BundleSource = MemorySource;

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document
    pub fn insert(&mut self, name: impl Into<String>, doc: SchemaDocument) {
        self.documents.insert(name.into(), doc);
    }

    /// Builder-style variant of [`MemorySource::insert`]
    pub fn with(mut self, name: impl Into<String>, doc: SchemaDocument) -> Self {
        self.insert(name, doc);
        self
    }

    /// Parse a JSON object mapping protocol name to schema document
    pub fn from_json(text: &str) -> Result<Self> {
        let documents: BTreeMap<String, SchemaDocument> = serde_json::from_str(text)?;
        Ok(Self { documents })
    }

    /// Load a bundle file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("Failed to read schema bundle {:?}: {}", path, e))
        })?;
        Self::from_json(&text).with_context(|| format!("Failed to parse schema bundle {:?}", path))
    }
}

impl SchemaSource for MemorySource {
    fn load(&self, name: &str) -> Result<ProtocolSchema> {
        let doc = self
            .documents
            .get(name)
            .cloned()
            .ok_or_else(|| MonitorError::SchemaNotFound {
                name: name.to_string(),
            })?;
        ProtocolSchema::from_document(name, doc)
    }

    fn names(&self) -> Result<Vec<String>> {
        Ok(self.documents.keys().cloned().collect())
    }
}

// ==================== Registry ====================

/// Caching registry of validated schemas
///
/// Safe to share across threads; each schema is read from its source at most
/// once until invalidated.
pub struct SchemaRegistry {
    source: Box<dyn SchemaSource>,
    cache: RwLock<HashMap<String, Arc<ProtocolSchema>>>,
    loading: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("cached", &self.cached_names())
            .finish()
    }
}

impl SchemaRegistry {
    pub fn new(source: impl SchemaSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
            loading: Mutex::new(HashMap::new()),
        }
    }

    /// Open the schema source named by the settings
    ///
    /// A bundle file takes precedence over a schema directory.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        if let Some(bundle) = &config.schema_bundle {
            tracing::debug!(path = %bundle.display(), "Using schema bundle");
            return Ok(Self::new(BundleSource::from_file(bundle)?));
        }
        let dir = config.schema_dir_path().ok_or_else(|| {
            MonitorError::Config("No schema directory configured".to_string())
        })?;
        tracing::debug!(path = %dir.display(), "Using schema directory");
        Ok(Self::new(DirectorySource::new(dir)?))
    }

    /// Get a schema by name, loading it on first use
    pub fn get(&self, name: &str) -> Result<Arc<ProtocolSchema>> {
        if let Some(schema) = self.read_cache().get(name) {
            return Ok(Arc::clone(schema));
        }

        // serialize loads per name only; the cache lock is never held during I/O
        let gate = self.load_gate(name);
        let _loading = gate.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(schema) = self.read_cache().get(name) {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(self.source.load(name)?);
        tracing::debug!(
            schema = name,
            fields = schema.fields.len(),
            length = schema.frame_length_bytes,
            "Loaded protocol schema"
        );
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Names of all schemas available from the source
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = self.source.names()?;
        names.sort();
        Ok(names)
    }

    /// Drop one cached schema so the next `get` re-reads it
    pub fn invalidate(&self, name: &str) -> bool {
        let removed = self
            .cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .is_some();
        if removed {
            tracing::debug!(schema = name, "Invalidated cached schema");
        }
        removed
    }

    /// Drop every cached schema
    pub fn clear(&self) {
        self.cache.write().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Names currently held in the cache
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_cache().keys().cloned().collect();
        names.sort();
        names
    }

    /// Decode raw bytes against a named schema
    pub fn decode(&self, name: &str, payload: &[u8]) -> Result<DecodedFrame> {
        let schema = self.get(name)?;
        decode(&schema, payload)
    }

    /// Decode a hex string against a named schema
    ///
    /// The hex is validated before the schema is looked up.
    pub fn decode_hex(&self, name: &str, text: &str) -> Result<DecodedFrame> {
        let payload = parse_hex(text)?;
        self.decode(name, &payload)
    }

    fn load_gate(&self, name: &str) -> Arc<Mutex<()>> {
        let mut gates = self.loading.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(gates.entry(name.to_string()).or_default())
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<ProtocolSchema>>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }
}
