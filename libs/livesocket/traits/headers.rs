use async_trait::async_trait;
use std::collections::HashMap;

/// HTTP headers to send with the websocket handshake
pub type Headers = HashMap<String, String>;

/// Trait for providing handshake headers dynamically
///
/// Called by the tungstenite dialer on every dial, so reconnections get
/// fresh values (tokens, timestamps, nonces).
///
/// # Example
/// ```ignore
/// struct ApiKey(String);
///
/// #[async_trait::async_trait]
/// impl HeaderProvider for ApiKey {
///     async fn get_headers(&self) -> Headers {
///         let mut headers = HashMap::new();
///         headers.insert("X-API-Key".to_string(), self.0.clone());
///         headers
///     }
/// }
/// ```
#[async_trait]
pub trait HeaderProvider: Send + Sync {
    /// Generate headers for the next handshake
    async fn get_headers(&self) -> Headers;
}

/// A no-op header provider that doesn't add any headers
pub struct NoHeaders;

#[async_trait]
impl HeaderProvider for NoHeaders {
    async fn get_headers(&self) -> Headers {
        HashMap::new()
    }
}

/// Fixed set of headers sent on every handshake
pub struct StaticHeaders(pub Headers);

#[async_trait]
impl HeaderProvider for StaticHeaders {
    async fn get_headers(&self) -> Headers {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Counter(AtomicU64);

    #[async_trait]
    impl HeaderProvider for Counter {
        async fn get_headers(&self) -> Headers {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            let mut headers = HashMap::new();
            headers.insert("X-Nonce".to_string(), n.to_string());
            headers
        }
    }

    #[tokio::test]
    async fn test_provider_evaluated_per_call() {
        let provider = Counter(AtomicU64::new(7));
        assert_eq!(provider.get_headers().await["X-Nonce"], "7");
        assert_eq!(provider.get_headers().await["X-Nonce"], "8");
    }

    #[tokio::test]
    async fn test_static_and_empty_headers() {
        let mut fixed = HashMap::new();
        fixed.insert("Authorization".to_string(), "Bearer abc".to_string());
        assert_eq!(StaticHeaders(fixed.clone()).get_headers().await, fixed);
        assert!(NoHeaders.get_headers().await.is_empty());
    }
}
