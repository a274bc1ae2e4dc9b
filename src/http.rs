use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, redirect};
use tracing::debug;

use crate::consumer::{self, Consumer, StreamHandle, Termination};
use crate::error::{Error, Result};

const ACCEPT_ANY: &str = "application/json, text/plain, */*";

/// Where the API server lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let url = url::Url::parse(s).map_err(|_| Error::Endpoint(s.to_string()))?;
        let host = url.host_str().ok_or_else(|| Error::Endpoint(s.to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::Endpoint(s.to_string()))?;
        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// One request, built fresh for every call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Path including any query string.
    pub path: String,
    pub method: Method,
    pub headers: HeaderMap,
}

impl RequestDescriptor {
    pub fn get(endpoint: &Endpoint, path: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_ANY));
        Self {
            scheme: endpoint.scheme.clone(),
            host: endpoint.host.clone(),
            port: endpoint.port,
            path: path.into(),
            method: Method::GET,
            headers,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn bearer(self, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        value.set_sensitive(true);
        Ok(self.header(AUTHORIZATION, value))
    }

    pub fn basic_auth(self, user: &str, password: &str) -> Result<Self> {
        let encoded = STANDARD.encode(format!("{user}:{password}"));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))?;
        value.set_sensitive(true);
        Ok(self.header(AUTHORIZATION, value))
    }

    pub fn url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

#[derive(Debug)]
pub struct Response<B> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Resolve once headers arrive; the consumer keeps running in the background.
    Async,
    /// Resolve once the consumer completes or the stream ends.
    Sync,
}

pub enum StreamBody<T> {
    /// Still streaming, see [`StreamHandle`].
    Detached(StreamHandle<T>),
    Completed(T),
    /// The stream ended before the consumer completed.
    Drained,
}

impl<T> StreamBody<T> {
    pub fn into_handle(self) -> Option<StreamHandle<T>> {
        match self {
            StreamBody::Detached(handle) => Some(handle),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
}

impl ResourceClient {
    pub fn new(insecure: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(Error::Client)?;
        Ok(Self { http })
    }

    /// GET and buffer the whole body.
    pub async fn fetch_body(&self, descriptor: &RequestDescriptor) -> Result<Response<Bytes>> {
        let url = descriptor.url();
        let response = self.send(descriptor).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = collect_body(response.bytes_stream())
            .await
            .map_err(|source| Error::Interrupted { url, source })?;
        Ok(Response { status, headers, body })
    }

    /// GET and feed the body chunk by chunk into `consumer`.
    pub async fn fetch_stream<C: Consumer>(
        &self,
        descriptor: &RequestDescriptor,
        consumer: C,
        mode: FetchMode,
    ) -> Result<Response<StreamBody<C::Output>>> {
        let response = self.send(descriptor).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let stream = response.bytes_stream();

        let body = match mode {
            FetchMode::Async => StreamBody::Detached(consumer::spawn(stream, consumer)),
            FetchMode::Sync => match consumer::run_inline(stream, consumer).await {
                Termination::Completed(value) => StreamBody::Completed(value),
                Termination::Drained | Termination::Cancelled => StreamBody::Drained,
            },
        };
        Ok(Response { status, headers, body })
    }

    async fn send(&self, descriptor: &RequestDescriptor) -> Result<reqwest::Response> {
        let url = descriptor.url();
        debug!(method = %descriptor.method, path = %descriptor.path, "sending request");
        let response = self
            .http
            .request(descriptor.method.clone(), &url)
            .headers(descriptor.headers.clone())
            .send()
            .await
            .map_err(|source| Error::Network { url: url.clone(), source })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            // Dropping the response aborts the transport; nothing else reads it.
            drop(response);
            return Err(Error::HttpStatus { url, status });
        }
        Ok(response)
    }
}

/// Concatenate every chunk in arrival order.
pub(crate) async fn collect_body<S, E>(stream: S) -> std::result::Result<Bytes, E>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
{
    let mut stream = Box::pin(stream);
    let mut body = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }
    Ok(body.freeze())
}
