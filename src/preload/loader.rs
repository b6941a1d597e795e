//! How a preload actually loads an image.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::intercept::OfflineInterceptor;

#[async_trait]
pub trait ImageLoader: Send + Sync + 'static {
    /// Resolves once the image is loaded, errors if it could not be.
    async fn load(&self, url: &str) -> Result<(), FetchError>;
}

/// Loads images through the interception layer so every preload warms the
/// images partition.
#[derive(Clone)]
pub struct InterceptorImageLoader {
    interceptor: OfflineInterceptor,
}

impl InterceptorImageLoader {
    pub fn new(interceptor: OfflineInterceptor) -> Self {
        Self { interceptor }
    }
}

#[async_trait]
impl ImageLoader for InterceptorImageLoader {
    async fn load(&self, url: &str) -> Result<(), FetchError> {
        let absolute = self.interceptor.config().resolve(url);
        self.interceptor.warm_image(&absolute).await
    }
}
