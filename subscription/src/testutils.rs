use crate::feed::{FeedSource, FetchError};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

/// Starts a feed server on a random local port that answers every request
/// with `status` and `body`. Returns the port and a request counter.
pub async fn start_feed_server(status: u16, body: String) -> (u16, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to address");
    let port = listener.local_addr().unwrap().port();

    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    let body = Bytes::from(body);

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let hits = hits_clone.clone();
            let body = body.clone();

            tokio::spawn(async move {
                let handler = move |_req: Request<hyper::body::Incoming>| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let mut response = Response::new(Full::new(body.clone()));
                    *response.status_mut() = StatusCode::from_u16(status).unwrap();
                    async move { Ok::<_, Infallible>(response) }
                };

                if let Err(err) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service_fn(handler))
                    .await
                {
                    eprintln!("Error serving connection: {:?}", err);
                }
            });
        }
    });

    (port, hits)
}

/// In-memory feed source that counts how often it was fetched.
pub struct StaticFeed {
    body: Option<Bytes>,
    fetches: AtomicUsize,
}

impl StaticFeed {
    pub fn new(body: impl Into<Bytes>) -> Self {
        StaticFeed {
            body: Some(body.into()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source whose every fetch fails.
    pub fn failing() -> Self {
        StaticFeed {
            body: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> Result<Bytes, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.body
            .clone()
            .ok_or(FetchError::Status(StatusCode::BAD_GATEWAY))
    }
}
