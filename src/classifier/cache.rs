use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

use crate::classifier::{Classifier, ClassifierProvider};
use crate::error::Result;

/// Loaded classifiers keyed by model id.
///
/// Lookups only take the read lock. A miss loads the classifier with no lock
/// held and then inserts it; when two requests race on the same id both load,
/// and both end up using whichever instance was inserted first. Failed loads
/// are not cached.
pub struct ClassifierCache {
    provider: Arc<dyn ClassifierProvider>,
    entries: RwLock<HashMap<String, Arc<dyn Classifier>>>,
}

impl ClassifierCache {
    pub fn new(provider: Arc<dyn ClassifierProvider>) -> Self {
        Self {
            provider,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, model_id: &str) -> Result<Arc<dyn Classifier>> {
        if let Some(hit) = self.cached(model_id) {
            return Ok(hit);
        }

        let loaded = self.provider.get_classifier(model_id)?;
        debug!(model = model_id, "classifier loaded");

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .entry(model_id.to_string())
            .or_insert(loaded)
            .clone())
    }

    pub fn cached(&self, model_id: &str) -> Option<Arc<dyn Classifier>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
