use crate::errors::ProxyError;
use crate::handler::ProxyHandler;
use http::{Method, StatusCode};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service as HyperService;
use hyper::{Request, Response};
use shared::http::{boxed, make_error_response};
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Routes inbound paths to their resource handler.
pub struct ProxyService {
    routes: HashMap<String, Arc<ProxyHandler>>,
}

impl ProxyService {
    pub fn new(handlers: Vec<ProxyHandler>) -> Self {
        let routes = handlers
            .into_iter()
            .map(|h| (h.route().to_string(), Arc::new(h)))
            .collect();
        Self { routes }
    }

    async fn dispatch(
        handler: Option<Arc<ProxyHandler>>,
        method: Method,
        query: Option<String>,
    ) -> Response<Bytes> {
        match handler {
            Some(handler) => handler.handle(&method, query.as_deref()).await,
            None => make_error_response(StatusCode::NOT_FOUND),
        }
    }
}

impl HyperService<Request<Incoming>> for ProxyService {
    type Response = Response<BoxBody<Bytes, Infallible>>;
    type Error = ProxyError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let handler = self.routes.get(req.uri().path()).cloned();
        let method = req.method().clone();
        let query = req.uri().query().map(str::to_owned);

        Box::pin(async move { Ok(boxed(Self::dispatch(handler, method, query).await)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::config::SigningConfig;
    use crate::testutils::{FixedClock, MockVendorClient, candidate, response, test_instant};
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use tokio::net::TcpListener;

    fn service(client: Arc<MockVendorClient>) -> ProxyService {
        let handlers = catalog::printbeat_resources_v1()
            .into_iter()
            .map(|mut resource| {
                resource.candidates = vec![candidate(&resource.name, "/externalApi/x")];
                ProxyHandler::new(
                    resource,
                    SigningConfig::default(),
                    client.clone(),
                    Arc::new(std::collections::HashMap::from([
                        ("JOBS_KEY".to_string(), "k".to_string()),
                        ("JOBS_SECRET".to_string(), "s".to_string()),
                    ])),
                    Arc::new(FixedClock(test_instant())),
                )
            })
            .collect();
        ProxyService::new(handlers)
    }

    #[tokio::test]
    async fn test_routes_by_path() {
        let client = Arc::new(MockVendorClient::new(vec![Ok(response(200, "jobs"))]));
        let service = service(client.clone());

        let handler = service.routes.get("/api/jobs").cloned();
        let response = ProxyService::dispatch(handler, Method::GET, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"jobs");
        assert_eq!(
            client.calls()[0].url.as_str(),
            "https://jobs.example.com/externalApi/x?startMarker=1&sortOrder=ASC"
        );

        // machines has no credentials in this setup
        let handler = service.routes.get("/api/machines").cloned();
        let response = ProxyService::dispatch(handler, Method::GET, None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(client.call_count(), 1);
    }

    async fn start_proxy_server(service: ProxyService) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let port = listener.local_addr().unwrap().port();
        let service = Arc::new(service);

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let service = service.clone();

                tokio::spawn(async move {
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        port
    }

    #[tokio::test]
    async fn test_serves_over_http() {
        let client = Arc::new(MockVendorClient::new(vec![Ok(response(200, "jobs"))]));
        let port = start_proxy_server(service(client.clone())).await;
        let http = reqwest::Client::new();

        let response = http
            .get(format!(
                "http://127.0.0.1:{port}/api/jobs?startMarker=5&sortOrder=DESC"
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "jobs");
        assert_eq!(
            client.calls()[0].url.as_str(),
            "https://jobs.example.com/externalApi/x?startMarker=5&sortOrder=DESC"
        );

        let response = http
            .post(format!("http://127.0.0.1:{port}/api/jobs"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = http
            .get(format!("http://127.0.0.1:{port}/api/unknown"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let client = Arc::new(MockVendorClient::new(vec![]));
        let service = service(client.clone());

        let handler = service.routes.get("/api/unknown").cloned();
        let response = ProxyService::dispatch(handler, Method::GET, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(client.call_count(), 0);
    }
}
