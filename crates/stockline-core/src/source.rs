// ── Source descriptors ──
//
// Pairs an always-available local producer with an optional remote one for
// a single logical piece of data. Immutable once built and cheap to clone.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use stockline_api::{Envelope, Error, InventoryClient};

/// One started remote call.
pub type RemoteCall<T> = BoxFuture<'static, Result<Envelope<T>, Error>>;

type LocalProducer<T> = Arc<dyn Fn() -> T + Send + Sync>;
type RemoteProducer<T> = Arc<dyn Fn(Arc<InventoryClient>) -> RemoteCall<T> + Send + Sync>;

pub struct SourceDescriptor<T> {
    name: String,
    local: LocalProducer<T>,
    remote: Option<RemoteProducer<T>>,
    auto_refresh: bool,
}

impl<T> Clone for SourceDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            local: Arc::clone(&self.local),
            remote: self.remote.clone(),
            auto_refresh: self.auto_refresh,
        }
    }
}

impl<T> std::fmt::Debug for SourceDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("remote", &self.remote.is_some())
            .field("auto_refresh", &self.auto_refresh)
            .finish()
    }
}

impl<T: Send + 'static> SourceDescriptor<T> {
    /// A local-only source. `local` must be pure and must not panic.
    pub fn new(name: impl Into<String>, local: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            local: Arc::new(local),
            remote: None,
            auto_refresh: false,
        }
    }

    /// Add the remote producer.
    pub fn with_remote<F, Fut>(mut self, remote: F) -> Self
    where
        F: Fn(Arc<InventoryClient>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Envelope<T>, Error>> + Send + 'static,
    {
        self.remote = Some(Arc::new(move |client| remote(client).boxed()));
        self
    }

    /// Re-resolve periodically while data comes from the service.
    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn produce_local(&self) -> T {
        (self.local)()
    }

    /// Start the remote producer against `client`, if there is one.
    pub fn produce_remote(&self, client: Arc<InventoryClient>) -> Option<RemoteCall<T>> {
        self.remote.as_ref().map(|remote| remote(client))
    }
}
