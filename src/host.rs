//! Services the embedding host supplies to a render.
//!
//! The renderer never talks to cameras, entity registries or template engines
//! directly. It is handed implementations of these traits instead, which keeps
//! the pipeline testable with in-memory stubs.

use std::collections::HashMap;
use std::future::Future;
use std::hash::BuildHasher;

use crate::error::{SourceUnavailableError, TemplateError};

/// Looks up the current state of an entity.
pub trait StateProvider: Send + Sync {
    /// Returns the entity's state, or `None` if it is unknown or failed.
    fn get_state(&self, entity_ref: &str) -> Option<String>;
}

impl<S: BuildHasher + Send + Sync> StateProvider for HashMap<String, String, S> {
    fn get_state(&self, entity_ref: &str) -> Option<String> {
        self.get(entity_ref).cloned()
    }
}

/// Renders host-side templates such as `{{ states('sensor.x') }}`.
pub trait TemplateRenderer: Sync {
    fn render(
        &self,
        template: &str,
        states: &dyn StateProvider,
    ) -> impl Future<Output = Result<String, TemplateError>> + Send;
}

/// Produces one encoded still image per call.
pub trait ImageSource: Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<u8>, SourceUnavailableError>> + Send;
}

/// An image source that always returns the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSource(pub Vec<u8>);

impl ImageSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<u8>, SourceUnavailableError> {
        Ok(self.0.clone())
    }
}
