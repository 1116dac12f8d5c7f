//! One request attempt, from option resolution to the returned response.

use super::{ClientInner, Request, Response};
use crate::body::{self, EncodedBody};
use crate::cache::{cache_key, expiry_deadline};
use crate::error::{ErrorCode, RestError};
use crate::options::{OptionsStore, ResponseFormat, RestOptions};
use crate::query::{apply_query, build_url};
use crate::transport::{
    AbortController, TransportError, TransportRequest, TransportResponse,
};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

fn timeout_message(timeout: Duration) -> String {
    let seconds = timeout.as_secs_f64();
    let plural = if format!("{seconds:.1}") == "1.0" { "" } else { "s" };
    format!("Request timed out after {seconds:.2} second{plural}")
}

fn transport_request(request: &Request, controller: &AbortController) -> TransportRequest {
    let options = &request.options;
    let mut headers = options.headers.clone().unwrap_or_default();

    let body = match request.method {
        Method::GET | Method::HEAD => None,
        _ => request.body.as_ref().map(body::Body::encode),
    };
    if let Some(EncodedBody {
        content_type: Some(content_type),
        ..
    }) = &body
    {
        if !headers.contains_key(CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::from_str(content_type) {
                headers.insert(CONTENT_TYPE, value);
            }
        }
    }

    TransportRequest {
        url: request.url.clone(),
        method: request.method.clone(),
        headers,
        body: body.map(|encoded| encoded.bytes),
        credentials: options.credentials.unwrap_or_default(),
        mode: options.mode.unwrap_or_default(),
        cache: options.cache.unwrap_or_default(),
        redirect: options.redirect.unwrap_or_default(),
        referrer: options.referrer.clone(),
        referrer_policy: options.referrer_policy.unwrap_or_default(),
        keepalive: options.keepalive.unwrap_or(false),
        signal: controller.signal(),
    }
}

/// Result of racing the transport against the timer.
struct Exchange {
    outcome: Result<TransportResponse, TransportError>,
    timeout_triggered: bool,
}

async fn race(
    inner: &ClientInner,
    request: TransportRequest,
    controller: &AbortController,
    timeout: Option<Duration>,
) -> Exchange {
    let Some(limit) = timeout else {
        return Exchange {
            outcome: inner.transport.send(request).await,
            timeout_triggered: false,
        };
    };

    tokio::select! {
        biased;
        outcome = inner.transport.send(request) => Exchange {
            outcome,
            timeout_triggered: false,
        },
        _ = tokio::time::sleep(limit) => {
            controller.abort();
            Exchange {
                outcome: Err(TransportError::Aborted),
                timeout_triggered: true,
            }
        }
    }
}

/// Run one attempt.
///
/// `base` replaces the client's option layer; `repeat` passes the options of
/// the attempt being repeated.
pub(crate) async fn execute(
    inner: &Arc<ClientInner>,
    method: Method,
    path: &str,
    base: Option<&RestOptions>,
    overrides: Option<RestOptions>,
) -> Result<Response, RestError> {
    let mut options = match base {
        Some(base) => OptionsStore::resolve(base, overrides),
        None => {
            let store = inner.options.read();
            OptionsStore::resolve(store.as_options(), overrides)
        }
    };
    options.cache_key = options.cache_key.map(|key| key.trim().to_string());

    let mut url = build_url(options.host.as_deref(), options.base_path.as_deref(), path)?;
    if let Some(query) = options.query.as_ref().filter(|query| !query.is_empty()) {
        apply_query(
            &mut url,
            query,
            options.query_params_transformer.as_ref(),
            options.query_params_include_empty.unwrap_or(false),
        )?;
    }

    let fingerprint = options.cache_in_memory.unwrap_or(false).then(|| {
        cache_key(
            options.cache_key.as_deref().unwrap_or_default(),
            &url,
            &method,
            options.body.as_ref(),
            options.response_format(),
        )
    });
    if let Some(key) = &fingerprint {
        trace!("Cache key for {} {}: '{}'", method, url, key);
        if let Some(cached) = inner.cache.get(key) {
            return Ok(cached);
        }
    }

    let controller = options
        .abort_controller
        .get_or_insert_with(AbortController::new)
        .clone();
    let request = Request {
        method,
        url,
        body: options.body.clone(),
        options,
    };

    if let Some(hook) = request.options.on_request.clone() {
        trace!("Running on_request for {} {}", request.method, request.url);
        hook.invoke(&request).await;
    }

    let timeout = request.options.timeout.filter(|t| !t.is_zero());
    debug!("{} {} (timeout {:?})", request.method, request.url, timeout);
    let exchange = race(
        inner,
        transport_request(&request, &controller),
        &controller,
        timeout,
    )
    .await;
    let timeout_triggered = exchange.timeout_triggered;
    let (raw, transport_error) = match exchange.outcome {
        Ok(raw) => (Some(raw), None),
        Err(error) => (None, Some(error)),
    };
    let fetch_fulfilled = raw.is_some();
    let aborted = !fetch_fulfilled
        && !timeout_triggered
        && transport_error.as_ref().is_some_and(TransportError::is_aborted);

    let mut format = ResponseFormat::None;
    let mut data = None;
    let mut parse_failed = false;
    if let Some(raw) = &raw {
        if let Some(response_type) = request.options.response_type.clone() {
            format = response_type.resolve(&request, Some(raw)).await;
        }
        if raw.is_empty_body() {
            format = ResponseFormat::None;
        }
        match body::parse_response(raw, format) {
            Ok(parsed) => data = parsed,
            Err(e) => {
                debug!("Failed to parse {} body as {}: {}", request.url, format, e);
                parse_failed = true;
            }
        }
    }

    let error = if parse_failed {
        Some(RestError::new(
            format!("An error occurred while parsing the response body as {format}"),
            None,
            Some(ErrorCode::BodyParse),
        ))
    } else if timeout_triggered && !fetch_fulfilled {
        warn!("{} {} timed out", request.method, request.url);
        Some(RestError::new(
            timeout_message(timeout.unwrap_or_default()),
            None,
            Some(ErrorCode::Timeout),
        ))
    } else if aborted {
        debug!("{} {} aborted", request.method, request.url);
        None
    } else if let Some(error) = transport_error {
        debug!("{} {} failed: {}", request.method, request.url, error);
        Some(RestError::from_transport(error))
    } else {
        raw.as_ref()
            .filter(|raw| !raw.ok())
            .map(|raw| RestError::new(raw.status_text.clone(), Some(raw.status), None))
    };
    let is_timeout = error.as_ref().is_some_and(RestError::is_timeout);

    let mut response = Response {
        status: raw.as_ref().map(|raw| raw.status),
        headers: raw.as_ref().map(|raw| raw.headers.clone()),
        fetch_response: raw,
        request,
        data,
        resolved_format: format,
        error: None,
        throw_filter: None,
        path: path.to_string(),
        client: Arc::downgrade(inner),
    };

    let mut error_consumed = false;
    if let Some(mut error) = error {
        error.data = response.data.take();
        error.request = Some(response.request.clone());
        error.fetch_response = response.fetch_response.clone();
        response.error = Some(error.clone());

        let options = &response.request.options;
        let throw = options.throws();
        let filters = options.throw_excluding.clone().unwrap_or_default();
        if throw || !filters.is_empty() {
            match error.find_first_match(&filters).await {
                Some(filter) => {
                    debug!("Error '{}' kept on response by throw filter", error);
                    filter.notify_match(&error);
                    response.throw_filter = Some(filter);
                }
                None if throw => match options.on_error.clone() {
                    Some(on_error) => {
                        error_consumed = true;
                        on_error.call(&error, &response);
                    }
                    None => return Err(error),
                },
                None => {}
            }
        }
    }

    if let Some(key) = fingerprint {
        let options = &response.request.options;
        let deadline = expiry_deadline(options.cache_expire_in, options.cache_expire_at);
        inner.cache.set(key, response.clone(), deadline);
    }

    if !error_consumed && !aborted && !is_timeout {
        if let Some(on_response) = response.request.options.on_response.clone() {
            on_response.call(&response);
        }
    }

    Ok(response)
}
