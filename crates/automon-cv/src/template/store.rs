//! Shared, hot-reloadable template map

use super::Template;
use crate::traits::TemplateSource;
use crate::Result;
use automon_core::{AssetId, Error};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

type TemplateMap = HashMap<AssetId, Arc<Template>>;

/// Asset-to-template map shared by every detector.
///
/// A reload swaps the whole map at once; queries running at that moment keep
/// the snapshot they started with.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: Arc<RwLock<Arc<TemplateMap>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        let map: TemplateMap = templates
            .into_iter()
            .map(|t| (t.id.clone(), Arc::new(t)))
            .collect();
        Self {
            templates: Arc::new(RwLock::new(Arc::new(map))),
        }
    }

    /// Load every template from `source`
    pub fn load(source: &dyn TemplateSource) -> Result<Self> {
        let store = Self::new();
        store.reload(source)?;
        Ok(store)
    }

    /// Replace the whole map with a fresh load from `source`.
    ///
    /// On failure the previous map stays in place.
    pub fn reload(&self, source: &dyn TemplateSource) -> Result<usize> {
        let fresh: TemplateMap = source
            .load_templates()?
            .into_iter()
            .map(|(id, t)| (id, Arc::new(t)))
            .collect();
        let count = fresh.len();
        *self.templates.write() = Arc::new(fresh);
        tracing::info!(count, "templates loaded");
        Ok(count)
    }

    /// Add or replace a single template
    pub fn insert(&self, template: Template) {
        let mut guard = self.templates.write();
        let mut map = TemplateMap::clone(&guard);
        map.insert(template.id.clone(), Arc::new(template));
        *guard = Arc::new(map);
    }

    pub fn snapshot(&self) -> Arc<TemplateMap> {
        self.templates.read().clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.read().get(name).cloned()
    }

    /// Validate an external asset name
    pub fn resolve(&self, name: &str) -> automon_core::Result<AssetId> {
        self.templates
            .read()
            .get_key_value(name)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| Error::UnknownAsset(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Asset ids in name order
    pub fn ids(&self) -> Vec<AssetId> {
        let mut ids: Vec<AssetId> = self.templates.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
