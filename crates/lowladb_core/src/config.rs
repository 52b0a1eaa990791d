//! Handle configuration.

use crate::types::Namespace;
use lowladb_storage::Document;
use std::fmt;
use std::sync::Arc;

/// Generates an `_id` for a document inserted without one.
pub type IdGenerator = Arc<dyn Fn(&Namespace, &Document) -> String + Send + Sync>;

/// Configuration for a [`crate::Lowla`] handle.
#[derive(Clone)]
pub struct Config {
    /// Generator for missing `_id` values.
    pub id_generator: IdGenerator,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_generator: Arc::new(|_, _| uuid::Uuid::new_v4().simple().to_string()),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("id_generator", &"<fn>")
            .finish()
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `_id` generator.
    #[must_use]
    pub fn with_id_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&Namespace, &Document) -> String + Send + Sync + 'static,
    {
        self.id_generator = Arc::new(generator);
        self
    }

    pub(crate) fn generate_id(&self, namespace: &Namespace, doc: &Document) -> String {
        (self.id_generator)(namespace, doc)
    }
}
