use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use url::Url;

use crate::data::{Headers, ResponseMetadata};

/// A boxed stream type for request and response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Transport errors must tell connect-level failures apart from the rest.
pub trait TransportError: std::error::Error + Send + Sync + 'static {
    /// `true` when the host could not be resolved or connected to.
    fn is_unreachable(&self) -> bool;
}

/// Status, headers and body of one HTTP exchange.
#[derive(Debug)]
pub struct HttpResponse<B> {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: B,
}

impl<B> HttpResponse<B> {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parsed `Content-Length`, if the server sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.header("content-length").and_then(|v| v.trim().parse().ok())
    }

    pub fn metadata(&self, body: Option<String>) -> ResponseMetadata {
        ResponseMetadata {
            status: self.status,
            headers: self.headers.clone(),
            body,
        }
    }
}

/// Streaming response body of a GET.
pub type ResponseStream<E> = BoxStream<'static, Result<Bytes, E>>;

/// A request body ready to hand to the transport.
pub struct UploadBody {
    pub content_type: String,
    /// Exact body length when every part could be sized up front.
    pub content_length: Option<u64>,
    pub stream: BoxStream<'static, io::Result<Bytes>>,
}

impl std::fmt::Debug for UploadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Asynchronous HTTP client abstraction.
///
/// One call is one exchange. Implementations follow their own redirect
/// defaults and must not retry.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    type Error: TransportError;

    /// Send a GET and return the response with its body still unread.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    fn get(
        &self,
        url: &Url,
        headers: &Headers,
    ) -> impl Future<Output = Result<HttpResponse<ResponseStream<Self::Error>>, Self::Error>> + Send;

    /// Stream `body` in a POST and return the fully read response.
    fn post(
        &self,
        url: &Url,
        headers: &Headers,
        body: UploadBody,
    ) -> impl Future<Output = Result<HttpResponse<Bytes>, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::time::Duration;

    use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};

    use super::*;
    use crate::error::{Error, Result};

    impl TransportError for reqwest::Error {
        fn is_unreachable(&self) -> bool {
            self.is_connect()
        }
    }

    /// Production HTTP client using reqwest.
    ///
    /// Idle connections are never pooled, so each transfer opens its own.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new(user_agent: &str, connect_timeout: Option<Duration>) -> Result<Self> {
            let mut builder = reqwest::Client::builder()
                .user_agent(user_agent)
                .pool_max_idle_per_host(0);
            if let Some(timeout) = connect_timeout {
                builder = builder.connect_timeout(timeout);
            }
            let client = builder.build().map_err(|e| Error::Unexpected(e.to_string()))?;
            Ok(Self { client })
        }

        pub fn from_config(config: &crate::EngineConfig) -> Result<Self> {
            Self::new(&config.user_agent, config.connect_timeout())
        }
    }

    fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect()
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn get(
            &self,
            url: &Url,
            headers: &Headers,
        ) -> std::result::Result<HttpResponse<ResponseStream<Self::Error>>, Self::Error> {
            let mut request = self.client.get(url.clone());
            for (key, value) in headers.iter() {
                request = request.header(key, value);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();
            let headers = collect_headers(response.headers());
            let body: ResponseStream<Self::Error> = Box::pin(response.bytes_stream());

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }

        async fn post(
            &self,
            url: &Url,
            headers: &Headers,
            body: UploadBody,
        ) -> std::result::Result<HttpResponse<Bytes>, Self::Error> {
            let mut request = self.client.post(url.clone());
            // Framing headers come from the body, never from the caller.
            for (key, value) in headers.iter() {
                if key.eq_ignore_ascii_case("content-type")
                    || key.eq_ignore_ascii_case("content-length")
                {
                    continue;
                }
                request = request.header(key, value);
            }
            request = request.header(CONTENT_TYPE, body.content_type);
            if let Some(len) = body.content_length {
                request = request.header(CONTENT_LENGTH, len.to_string());
            }

            let response = request
                .body(reqwest::Body::wrap_stream(body.stream))
                .send()
                .await?;
            let status = response.status().as_u16();
            let headers = collect_headers(response.headers());
            let body = response.bytes().await?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
