//! Correlation middleware stamping every request with a [`CorrelationId`].
//!
//! A caller-supplied `X-Correlation-Id` header is reused verbatim; otherwise a
//! UUID v4 is generated and written back onto the request headers. The id is
//! stored in request extensions, placed in task-local storage for the
//! downstream future, and echoed on the response. Downstream work runs inside
//! a `request` tracing span carrying the id, so every log event emitted while
//! handling the request is tagged with it. The span closes when the future
//! completes, whether it succeeds or fails.

use std::future::{Ready as StdReady, ready as std_ready};
use std::task::{Context, Poll};

use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::InternalError;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{Instrument, debug, error, info_span, warn};

use crate::domain::{CORRELATION_ID_HEADER, CorrelationId};

/// What the caller sent in the correlation header.
enum Inbound {
    Supplied,
    Absent,
    Unusable(String),
}

/// Reuse the inbound header when usable, otherwise mint a fresh identifier.
fn resolve_correlation_id(req: &ServiceRequest) -> (CorrelationId, Inbound) {
    let Some(value) = req.headers().get(CORRELATION_ID_HEADER) else {
        return (CorrelationId::generate(), Inbound::Absent);
    };

    match value.to_str().map(CorrelationId::parse) {
        Ok(Ok(id)) => (id, Inbound::Supplied),
        Ok(Err(err)) => (CorrelationId::generate(), Inbound::Unusable(err.to_string())),
        Err(_) => (
            CorrelationId::generate(),
            Inbound::Unusable("header is not visible ascii".to_owned()),
        ),
    }
}

fn header_name() -> HeaderName {
    HeaderName::from_static(CORRELATION_ID_HEADER)
}

/// Render an error raised below this middleware now, so the header can be
/// attached to the response actix eventually sends.
fn stamp_error(err: Error, value: HeaderValue) -> Error {
    let mut response = err.error_response();
    response.headers_mut().insert(header_name(), value);
    InternalError::from_response(err.to_string(), response).into()
}

/// Middleware factory attaching a correlation id to every request.
///
/// Handlers can read the id via [`CorrelationId::current`] or by taking a
/// [`CorrelationId`] extractor argument.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use workshop::middleware::Correlation;
///
/// let app = App::new().wrap(Correlation);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Correlation;

impl<S, B> Transform<S, ServiceRequest> for Correlation
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CorrelationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorrelationMiddleware { service }))
    }
}

/// Service wrapper produced by [`Correlation`].
pub struct CorrelationMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for CorrelationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let (correlation_id, inbound) = resolve_correlation_id(&req);
        let header_value = HeaderValue::from_str(correlation_id.as_str());
        if let (Inbound::Absent | Inbound::Unusable(_), Ok(value)) = (&inbound, &header_value) {
            req.headers_mut().insert(header_name(), value.clone());
        }
        req.extensions_mut().insert(correlation_id.clone());

        let span = info_span!(
            "request",
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.path(),
        );
        // The request must not be cloned before this call: routing needs
        // exclusive access to it.
        let fut = self.service.call(req);
        let scoped_id = correlation_id.clone();

        let handled = async move {
            if let Inbound::Unusable(reason) = inbound {
                warn!(%reason, "replaced unusable correlation id header");
            }
            let value = match header_value {
                Ok(value) => value,
                Err(err) => {
                    error!(
                        error = %err,
                        correlation_id = %correlation_id,
                        "failed to encode correlation id header"
                    );
                    return fut.await;
                }
            };
            match fut.await {
                Ok(mut res) => {
                    res.response_mut().headers_mut().insert(header_name(), value);
                    debug!(status = res.status().as_u16(), "request completed");
                    Ok(res)
                }
                Err(err) => {
                    debug!(error = %err, "request failed");
                    Err(stamp_error(err, value))
                }
            }
        }
        .instrument(span);

        Box::pin(CorrelationId::scope(scoped_id, handled))
    }
}

impl FromRequest for CorrelationId {
    type Error = Error;
    type Future = StdReady<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let id = req
            .extensions()
            .get::<CorrelationId>()
            .cloned()
            .or_else(CorrelationId::current)
            .unwrap_or_else(CorrelationId::generate);
        std_ready(Ok(id))
    }
}
