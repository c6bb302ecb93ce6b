use axum::{routing::get, Router};
use tracing::{error, info};

pub const ALIVE_MESSAGE: &str = "✅ Bot is alive!";

/// Uptime monitors poll `/`. Nothing here touches bot state.
pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

pub async fn spawn(bind_address: &str, port: u16) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.keepalive.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "keep-alive endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router()).await {
            error!(
                event_name = "system.keepalive.error",
                correlation_id = "bootstrap",
                error = %error,
                "keep-alive endpoint terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn alive() -> &'static str {
    ALIVE_MESSAGE
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::health::{alive, router, ALIVE_MESSAGE};

    #[tokio::test]
    async fn alive_returns_fixed_text() {
        assert_eq!(alive().await, "✅ Bot is alive!");
    }

    #[tokio::test]
    async fn root_route_serves_alive_message() {
        let response = router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.expect("body");
        assert_eq!(body.as_ref(), ALIVE_MESSAGE.as_bytes());
    }

    #[tokio::test]
    async fn other_routes_are_not_served() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
