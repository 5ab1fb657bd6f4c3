//! Mailbox analytics endpoints
//!
//! Query parameters are read as raw strings and validated only after the
//! session check, so an anonymous request is always answered with 401.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use mail::analytics::DEFAULT_TOP_SENDERS;
use mail::{DateWindow, EmailMetrics, Error, SenderCount, SizeDistribution, TimeDistribution};

use super::AppState;
use crate::error::ApiError;
use crate::session::request_session;

type Params = HashMap<String, String>;

fn parse_param<T: FromStr>(params: &Params, name: &str) -> mail::Result<Option<T>> {
    match params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidRequest(format!("{name} must be a positive integer, got {raw:?}"))),
    }
}

fn window(params: &Params) -> mail::Result<DateWindow> {
    DateWindow::from_param(parse_param(params, "days")?)
}

/// `GET /api/analytics`
pub async fn summary(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Result<Json<EmailMetrics>, ApiError> {
    let session = request_session(&headers);
    let metrics = state
        .run(move |service| {
            let token = service.access_token(session.as_ref())?;
            service.email_metrics(&token, window(&params)?)
        })
        .await?;
    Ok(Json(metrics))
}

/// `GET /api/analytics/top-senders`
pub async fn top_senders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Result<Json<Vec<SenderCount>>, ApiError> {
    let session = request_session(&headers);
    let senders = state
        .run(move |service| {
            let token = service.access_token(session.as_ref())?;
            let limit = parse_param(&params, "limit")?.unwrap_or(DEFAULT_TOP_SENDERS);
            service.top_senders(&token, window(&params)?, Some(limit))
        })
        .await?;
    Ok(Json(senders))
}

/// `GET /api/analytics/time-distribution`
pub async fn time_distribution(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Result<Json<TimeDistribution>, ApiError> {
    let session = request_session(&headers);
    let hours = state
        .run(move |service| {
            let token = service.access_token(session.as_ref())?;
            service.time_distribution(&token, window(&params)?)
        })
        .await?;
    Ok(Json(hours))
}

/// `GET /api/analytics/size-distribution`
pub async fn size_distribution(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Result<Json<SizeDistribution>, ApiError> {
    let session = request_session(&headers);
    let sizes = state
        .run(move |service| {
            let token = service.access_token(session.as_ref())?;
            service.size_distribution(&token, window(&params)?)
        })
        .await?;
    Ok(Json(sizes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{auth, testing};
    use axum::http::{HeaderValue, StatusCode, header};
    use mail::CallbackParams;

    fn params(pairs: &[(&str, &str)]) -> Query<Params> {
        Query(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    /// Headers carrying an authenticated session
    async fn logged_in(state: &Arc<AppState>) -> HeaderMap {
        let redirect = state.service.begin_login().unwrap();
        let csrf_state = state
            .service
            .sessions()
            .get(&redirect.session_id)
            .unwrap()
            .unwrap()
            .csrf_state()
            .unwrap()
            .to_string();
        let session = state
            .service
            .complete_login(
                Some(&redirect.session_id),
                &CallbackParams {
                    code: Some("good-code".to_string()),
                    state: Some(csrf_state),
                    error: None,
                },
            )
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", session.id)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_every_endpoint_requires_session() {
        let state = testing::state();

        let err = summary(State(state.clone()), HeaderMap::new(), params(&[])).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        let err = top_senders(State(state.clone()), HeaderMap::new(), params(&[])).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        let err = time_distribution(State(state.clone()), HeaderMap::new(), params(&[])).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        let err = size_distribution(State(state.clone()), HeaderMap::new(), params(&[])).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        let err = auth::verify_token(State(state), HeaderMap::new()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_session_is_checked_before_parameters() {
        let err = summary(State(testing::state()), HeaderMap::new(), params(&[("days", "nope")]))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_days_is_bad_request() {
        let state = testing::state();
        let headers = logged_in(&state).await;

        for days in ["0", "366", "-3", "soon"] {
            let err = summary(State(state.clone()), headers.clone(), params(&[("days", days)]))
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "days={days}");
        }
    }

    #[tokio::test]
    async fn test_summary() {
        let state = testing::state();
        let headers = logged_in(&state).await;

        let Json(metrics) = summary(State(state), headers, params(&[("days", "7")])).await.unwrap();
        assert_eq!(metrics.days, 7);
        assert_eq!(metrics.total_emails, 2);
        assert_eq!(metrics.senders["alice@example.com"], 2);
    }

    #[tokio::test]
    async fn test_distributions_sum_to_total() {
        let state = testing::state();
        let headers = logged_in(&state).await;

        let Json(hours) = time_distribution(State(state.clone()), headers.clone(), params(&[]))
            .await
            .unwrap();
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[&10], 1);
        assert_eq!(hours[&11], 1);
        assert_eq!(hours.values().sum::<usize>(), 2);

        let Json(sizes) = size_distribution(State(state.clone()), headers.clone(), params(&[]))
            .await
            .unwrap();
        assert_eq!(sizes.small, 2);

        let Json(senders) = top_senders(State(state), headers, params(&[("limit", "5")]))
            .await
            .unwrap();
        assert_eq!(senders.len(), 1);
        assert_eq!(senders[0].count, 2);
    }
}
