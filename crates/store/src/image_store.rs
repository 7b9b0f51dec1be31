use std::collections::HashMap;

use imgflow_core::types::TaskKey;

/// Result images keyed by task identity.
///
/// Write-once: a stored image is never replaced. Not synchronised on its
/// own; [`TaskStore`](crate::TaskStore) holds it under the same lock as the
/// task map so status and image change together.
#[derive(Debug, Default)]
pub struct ImageStore {
    images: HashMap<TaskKey, String>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `image` for `key`. Returns `false` if an image already exists,
    /// in which case the existing one is kept.
    pub fn insert(&mut self, key: TaskKey, image: String) -> bool {
        if self.images.contains_key(&key) {
            return false;
        }
        self.images.insert(key, image);
        true
    }

    pub fn get(&self, key: &TaskKey) -> Option<&str> {
        self.images.get(key).map(String::as_str)
    }
}
