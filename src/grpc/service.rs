//! Rate limit service implementation.

use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, instrument, warn};

use super::proto::{
    rate_limit_service_server::RateLimitService, Code, HeaderValue, RateLimitRequest,
    RateLimitResponse, RecordResponse,
};

use crate::ratelimit::{Decision, ExclusionList, RateLimiterBackend};

/// Implementation of the `votegate.v1.RateLimitService` gRPC interface.
pub struct RateLimitServiceImpl<R: RateLimiterBackend> {
    /// The rate limiter instance
    rate_limiter: Arc<R>,
    /// Paths that are never limited or recorded
    exclusions: Arc<ExclusionList>,
}

impl<R: RateLimiterBackend> RateLimitServiceImpl<R> {
    pub fn new(rate_limiter: Arc<R>, exclusions: Arc<ExclusionList>) -> Self {
        Self {
            rate_limiter,
            exclusions,
        }
    }

    fn validate(request: &RateLimitRequest) -> Result<(), Status> {
        if request.path.is_empty() {
            warn!("Received rate limit request with empty path");
            return Err(Status::invalid_argument("path is required"));
        }
        Ok(())
    }
}

fn excluded_response() -> RateLimitResponse {
    RateLimitResponse {
        code: Code::Ok.into(),
        excluded: true,
        ..Default::default()
    }
}

impl From<Decision> for RateLimitResponse {
    fn from(decision: Decision) -> Self {
        let code = if decision.allowed { Code::Ok } else { Code::OverLimit };
        let response_headers_to_add = decision
            .headers()
            .into_iter()
            .map(|(key, value)| HeaderValue {
                key: key.to_string(),
                value,
            })
            .collect();

        RateLimitResponse {
            code: code.into(),
            category: decision.category.to_string(),
            limit: decision.limit,
            remaining: decision.remaining,
            reset: decision.reset(),
            window: decision.window_seconds,
            excluded: false,
            response_headers_to_add,
        }
    }
}

#[tonic::async_trait]
impl<R: RateLimiterBackend + 'static> RateLimitService for RateLimitServiceImpl<R> {
    /// Decide on a request and record it if admitted.
    #[instrument(
        skip(self, request),
        fields(
            client = %request.get_ref().client_key,
            path = %request.get_ref().path
        )
    )]
    async fn should_rate_limit(
        &self,
        request: Request<RateLimitRequest>,
    ) -> Result<Response<RateLimitResponse>, Status> {
        let req = request.into_inner();
        Self::validate(&req)?;

        if self.exclusions.is_excluded(&req.path) {
            debug!(path = %req.path, "Path excluded from rate limiting");
            return Ok(Response::new(excluded_response()));
        }

        let decision = self.rate_limiter.check(&req.client_key, &req.path).await;
        Ok(Response::new(decision.into()))
    }

    /// Decide on a request without recording it.
    #[instrument(
        skip(self, request),
        fields(
            client = %request.get_ref().client_key,
            path = %request.get_ref().path
        )
    )]
    async fn evaluate(
        &self,
        request: Request<RateLimitRequest>,
    ) -> Result<Response<RateLimitResponse>, Status> {
        let req = request.into_inner();
        Self::validate(&req)?;

        if self.exclusions.is_excluded(&req.path) {
            return Ok(Response::new(excluded_response()));
        }

        let decision = self.rate_limiter.evaluate(&req.client_key, &req.path).await;
        Ok(Response::new(decision.into()))
    }

    /// Record a request the caller admitted.
    #[instrument(
        skip(self, request),
        fields(
            client = %request.get_ref().client_key,
            path = %request.get_ref().path
        )
    )]
    async fn record(
        &self,
        request: Request<RateLimitRequest>,
    ) -> Result<Response<RecordResponse>, Status> {
        let req = request.into_inner();
        Self::validate(&req)?;

        if self.exclusions.is_excluded(&req.path) {
            return Ok(Response::new(RecordResponse { recorded: false }));
        }

        self.rate_limiter.record(&req.client_key, &req.path).await;
        Ok(Response::new(RecordResponse { recorded: true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{
        reference_exclusions, LimiterSettings, ManualClock, PolicyEntry, PolicyTable, RateLimiter,
    };

    fn service() -> RateLimitServiceImpl<RateLimiter> {
        let policies = PolicyTable::new(vec![
            PolicyEntry::new("/api/v1/auth/login", 2, 300),
            PolicyEntry::new("default", 100, 300),
        ])
        .unwrap();
        let limiter = RateLimiter::new(
            policies,
            LimiterSettings::default(),
            Arc::new(ManualClock::new(1_000.0)),
        );
        let exclusions = ExclusionList::new(&reference_exclusions()).unwrap();

        RateLimitServiceImpl::new(Arc::new(limiter), Arc::new(exclusions))
    }

    fn request(client_key: &str, path: &str) -> Request<RateLimitRequest> {
        Request::new(RateLimitRequest {
            client_key: client_key.to_string(),
            path: path.to_string(),
        })
    }

    #[tokio::test]
    async fn test_empty_path_rejected() {
        let service = service();

        let result = service.should_rate_limit(request("1.2.3.4", "")).await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);

        let result = service.evaluate(request("1.2.3.4", "")).await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);

        let result = service.record(request("1.2.3.4", "")).await;
        assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_valid_request_returns_ok() {
        let service = service();

        let response = service
            .should_rate_limit(request("1.2.3.4", "/api/v1/auth/login"))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.code(), Code::Ok);
        assert_eq!(response.category, "/api/v1/auth/login");
        assert_eq!(response.limit, 2);
        assert_eq!(response.remaining, 1);
        assert_eq!(response.reset, 1_300);
        assert_eq!(response.window, 300);
        assert!(!response.excluded);
        assert_eq!(response.response_headers_to_add.len(), 4);
    }

    #[tokio::test]
    async fn test_over_limit_carries_retry_after() {
        let service = service();

        for _ in 0..2 {
            let response = service
                .should_rate_limit(request("1.2.3.4", "/api/v1/auth/login"))
                .await
                .unwrap()
                .into_inner();
            assert_eq!(response.code(), Code::Ok);
        }

        let response = service
            .should_rate_limit(request("1.2.3.4", "/api/v1/auth/login"))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.code(), Code::OverLimit);
        assert_eq!(response.remaining, 0);
        let retry_after = response
            .response_headers_to_add
            .iter()
            .find(|h| h.key == "Retry-After")
            .unwrap();
        assert_eq!(retry_after.value, "300");
    }

    #[tokio::test]
    async fn test_evaluate_then_record() {
        let service = service();

        for _ in 0..3 {
            let response = service
                .evaluate(request("1.2.3.4", "/api/v1/auth/login"))
                .await
                .unwrap()
                .into_inner();
            assert_eq!(response.code(), Code::Ok);
        }

        for _ in 0..2 {
            let recorded = service
                .record(request("1.2.3.4", "/api/v1/auth/login"))
                .await
                .unwrap()
                .into_inner();
            assert!(recorded.recorded);
        }

        let response = service
            .evaluate(request("1.2.3.4", "/api/v1/auth/login"))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.code(), Code::OverLimit);
    }

    #[tokio::test]
    async fn test_excluded_paths_bypass_limiter() {
        let service = service();

        for _ in 0..200 {
            let response = service
                .should_rate_limit(request("1.2.3.4", "/health"))
                .await
                .unwrap()
                .into_inner();
            assert_eq!(response.code(), Code::Ok);
            assert!(response.excluded);
            assert!(response.response_headers_to_add.is_empty());
        }

        let recorded = service
            .record(request("1.2.3.4", "/static/app.js"))
            .await
            .unwrap()
            .into_inner();
        assert!(!recorded.recorded);
        assert_eq!(service.rate_limiter.tracked_clients(), 0);
    }

    #[tokio::test]
    async fn test_missing_client_key_is_tracked_as_unknown() {
        let service = service();

        service
            .should_rate_limit(request("", "/api/v1/votes"))
            .await
            .unwrap();

        assert!(service.rate_limiter.is_tracking("unknown"));
    }

    #[test]
    fn test_code_names() {
        assert_eq!(Code::Ok.as_str_name(), "OK");
        assert_eq!(Code::OverLimit.as_str_name(), "OVER_LIMIT");
    }
}
