use std::future::Future;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use log::{debug, info};
use tokio::net::TcpListener;

pub struct ServerBuilder {
    name: &'static str,
    router: Router,
}

impl ServerBuilder {
    pub fn new(name: &'static str) -> Self {
        let router = Router::new().route("/health", get(|| async { "SERVING" }));
        Self { name, router }
    }

    pub fn add_routes(mut self, routes: Router) -> Self {
        self.router = self.router.merge(routes);
        self
    }

    pub fn into_router(self) -> Router {
        self.router
            .layer(middleware::from_fn_with_state(self.name, trace_request))
    }

    pub async fn serve<F>(
        self,
        // We must use the TCP listener from tokio so that the server can shut down gracefully.
        listener: TcpListener,
        signal: F,
    ) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = self.name;
        let addr = listener.local_addr()?;
        info!("{name} server listening on {addr}");
        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(signal)
            .await?;
        info!("{name} server has stopped");
        Ok(())
    }
}

async fn trace_request(State(name): State<&'static str>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    debug!("{name} {method} {uri} {}", response.status());
    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::post;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_health_and_custom_routes() -> Result<(), Box<dyn std::error::Error>> {
        let routes = Router::new().route("/ping", post(|| async { StatusCode::ACCEPTED }));
        let router = ServerBuilder::new("test").add_routes(routes).into_router();

        let response = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::post("/ping").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        Ok(())
    }
}
