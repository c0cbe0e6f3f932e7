use axum::{
    extract::{Request, State},
    http::header::CONTENT_LENGTH,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

/// First stage of the pipeline: reject declared bodies over `max_bytes`
/// before any counting or token work is done.
pub async fn check_request_size(
    State(max_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > max_bytes as u64) {
        return Err(AppError::PayloadTooLarge);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::StatusCode,
        middleware::from_fn_with_state,
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/", post(|| async { "ok" }))
            .layer(from_fn_with_state(16usize, check_request_size))
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let res = app()
            .oneshot(
                Request::post("/")
                    .header(CONTENT_LENGTH, "17")
                    .body(Body::from(vec![b'a'; 17]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn body_within_limit_passes() {
        let res = app()
            .oneshot(
                Request::post("/")
                    .header(CONTENT_LENGTH, "16")
                    .body(Body::from(vec![b'a'; 16]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
