use super::{Transport, TransportError, TransportRequest, TransportResponse};
use crate::options::Redirect;
use async_trait::async_trait;
use http::header::{CACHE_CONTROL, REFERER};
use http::HeaderValue;
use tracing::debug;

/// [`Transport`] backed by `reqwest`.
///
/// Two clients are kept because reqwest fixes the redirect policy per client:
/// one follows redirects, the other returns 3xx responses as they are.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    follow: reqwest::Client,
    manual: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let follow = reqwest::Client::builder()
            .build()
            .map_err(TransportError::from_source)?;
        let manual = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(TransportError::from_source)?;
        Ok(Self { follow, manual })
    }

    /// Use preconfigured clients, e.g. with custom TLS roots or proxies.
    pub fn with_clients(follow: reqwest::Client, manual: reqwest::Client) -> Self {
        Self { follow, manual }
    }

    fn client_for(&self, redirect: Redirect) -> &reqwest::Client {
        match redirect {
            Redirect::Follow => &self.follow,
            Redirect::Error | Redirect::Manual => &self.manual,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            url,
            method,
            mut headers,
            body,
            cache,
            redirect,
            referrer,
            signal,
            ..
        } = request;

        if signal.aborted() {
            return Err(TransportError::Aborted);
        }

        if let Some(directive) = cache.cache_control() {
            if !headers.contains_key(CACHE_CONTROL) {
                headers.insert(CACHE_CONTROL, HeaderValue::from_static(directive));
            }
        }
        if let Some(referrer) = referrer.filter(|r| !r.is_empty()) {
            if let Ok(value) = HeaderValue::from_str(&referrer) {
                headers.entry(REFERER).or_insert(value);
            }
        }
        debug!("Sending {} {}", method, url);
        let mut builder = self
            .client_for(redirect)
            .request(method.clone(), url.clone())
            .headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let exchange = async {
            let response = builder.send().await.map_err(TransportError::from_source)?;
            let status = response.status();
            if redirect == Redirect::Error && status.is_redirection() {
                return Err(TransportError::network(format!(
                    "Redirect from {url} refused: redirect mode is 'error'"
                )));
            }
            let final_url = response.url().clone();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(TransportError::from_source)?;
            Ok(TransportResponse {
                url: final_url,
                status,
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers,
                body,
            })
        };

        tokio::select! {
            biased;
            _ = signal.cancelled() => {
                debug!("{} {} aborted", method, url);
                Err(TransportError::Aborted)
            }
            result = exchange => result,
        }
    }
}
