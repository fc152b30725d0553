use crate::batch::parse_feed;
use crate::errors::{ServerError, SubscribeError};
use crate::feed::{FeedSource, decode_feed};
use crate::metrics_defs::{SUBSCRIBE_DURATION, SUBSCRIBE_REQUESTS, SUBSCRIBE_SERVERS};
use crate::render::Renderer;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode, Uri};
use shared::http::{make_boxed_error_response, make_text_response};
use shared::{counter, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

pub const SUBSCRIBE_PATH: &str = "/subscribe";

/// The fetch, decode, parse and render pipeline behind `/subscribe`.
///
/// Built once at startup. Nothing in here changes between requests.
pub struct Subscription {
    token: String,
    feed: Arc<dyn FeedSource>,
    renderer: Arc<dyn Renderer>,
}

impl Subscription {
    pub fn new(token: String, feed: Arc<dyn FeedSource>, renderer: Arc<dyn Renderer>) -> Self {
        Subscription {
            token,
            feed,
            renderer,
        }
    }

    /// Runs one request through the pipeline. A missing token is treated as empty.
    pub async fn handle(&self, token: Option<&str>) -> Result<String, SubscribeError> {
        if token.unwrap_or_default() != self.token {
            return Err(SubscribeError::PermissionDenied);
        }

        let raw = self.feed.fetch().await?;
        let text = decode_feed(&raw)?;
        let servers = parse_feed(&text)?;
        let output = self.renderer.render(&servers).await?;

        histogram!(SUBSCRIBE_SERVERS).record(servers.len() as f64);
        tracing::debug!(servers = servers.len(), "Rendered subscription");

        Ok(output)
    }
}

pub struct SubscribeService {
    subscription: Arc<Subscription>,
}

impl SubscribeService {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription: Arc::new(subscription),
        }
    }
}

impl Service<Request<Incoming>> for SubscribeService {
    type Response = Response<BoxBody<Bytes, ServerError>>;
    type Error = ServerError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let subscription = self.subscription.clone();
        let method = req.method().clone();
        let uri = req.uri().clone();

        Box::pin(async move { Ok(respond(&subscription, &method, &uri).await) })
    }
}

async fn respond(
    subscription: &Subscription,
    method: &Method,
    uri: &Uri,
) -> Response<BoxBody<Bytes, ServerError>> {
    if uri.path() != SUBSCRIBE_PATH {
        return make_boxed_error_response(StatusCode::NOT_FOUND);
    }
    if method != Method::GET {
        return make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
    }

    let token = query_token(uri);
    let start = Instant::now();
    let result = subscription.handle(token.as_deref()).await;
    histogram!(SUBSCRIBE_DURATION).record(start.elapsed().as_secs_f64());

    match result {
        Ok(output) => {
            counter!(SUBSCRIBE_REQUESTS, "status" => "ok").increment(1);
            make_text_response(StatusCode::OK, output)
        }
        Err(e) => {
            counter!(SUBSCRIBE_REQUESTS, "status" => e.kind()).increment(1);
            match e {
                SubscribeError::PermissionDenied => {
                    tracing::warn!(error = %e, "Rejected subscribe request")
                }
                _ => tracing::error!(error = %e, "Subscribe request failed"),
            }
            make_text_response(e.status(), e.body())
        }
    }
}

// First `token` value in the query string, if any.
fn query_token(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}
