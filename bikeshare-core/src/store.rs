//! The database handle passed to every model.
//!
//! A [`DocumentStore`] owns the backend (the connection) together with the
//! [`Settings`] the projections need. Models borrow it for the duration of a request.
//!
//! ```ignore
//! use bikeshare::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let mut network = Document::<Network, _>::new(&store);
//! network.read("velib").await?;
//! ```

use crate::{
    backend::StoreBackend,
    collection::Collection,
    error::DocumentStoreResult,
    settings::Settings,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    settings: Settings,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend and default settings.
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, Settings::default())
    }

    pub fn with_settings(backend: B, settings: Settings) -> Self {
        Self { backend, settings }
    }

    /// Returns the backend this store issues its operations to.
    pub fn connection(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets a handle on the collection with the given name.
    pub fn collection<'a>(&'a self, name: &'a str) -> Collection<'a, B> {
        Collection::new(name, &self.backend)
    }

    /// Shuts the backend down, consuming the store.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}
