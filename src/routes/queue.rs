use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::AppError;
use crate::proxy;
use crate::AppState;

/// `GET`/`OPTIONS` on the queue route: forward to the spreadsheet backend.
///
/// Every response carries the open CORS policy so the static site can call
/// the proxy from any origin. Forwarded responses additionally carry cache
/// suppression headers; the browser must never reuse a queue snapshot.
pub async fn queue(
    State(state): State<AppState>,
    method: Method,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let response = match method {
        // Preflight short-circuits before the configuration check; it must
        // succeed regardless of deployment state.
        Method::OPTIONS => StatusCode::OK.into_response(),
        Method::GET => match state.config.upstream_url.as_deref() {
            // Nothing to forward to; surface the missing deployment setting
            // instead of calling anything.
            None => AppError::MissingUpstream.into_response(),
            Some(upstream) => {
                let response = match forward(&state, upstream, raw_query.as_deref()).await {
                    Ok(response) => response,
                    Err(e) => e.into_response(),
                };
                with_no_cache(response)
            }
        },
        _ => AppError::MethodNotAllowed.into_response(),
    };
    with_cors(response)
}

async fn forward(
    state: &AppState,
    upstream: &str,
    raw_query: Option<&str>,
) -> Result<Response, AppError> {
    let url = proxy::build_upstream_url(upstream, raw_query, proxy::unix_millis())?;
    let data = proxy::fetch_json(&state.http_client, url).await?;
    Ok((StatusCode::OK, Json(data)).into_response())
}

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

fn with_no_cache(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
