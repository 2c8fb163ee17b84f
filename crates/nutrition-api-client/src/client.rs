use crate::error::message_from_body;
use crate::models::{
    AuthPayload, DailyProgress, FoodLogRequest, FoodLogResponse, LoginRequest, ProfileUpdate,
    RegisterRequest, WaterLogRequest, WaterLogResponse, WeeklyProgress,
};
use crate::{
    ApiError, ApiResult, BearerAuthMiddleware, CredentialProvider, UnauthorizedHandler,
    UnauthorizedMiddleware,
};
use chrono::NaiveDate;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

/// Client for the nutrition service.
///
/// Every request passes through [`BearerAuthMiddleware`] and
/// [`UnauthorizedMiddleware`], so call sites never handle credentials or
/// the global 401 reaction themselves.
#[derive(Clone)]
pub struct ApiClient {
    http: ClientWithMiddleware,
    base_url: Url,
}

impl ApiClient {
    pub fn new(
        config: ApiClientConfig,
        credentials: Arc<dyn CredentialProvider>,
        unauthorized: Arc<dyn UnauthorizedHandler>,
    ) -> ApiResult<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let http = ClientBuilder::new(inner)
            .with(BearerAuthMiddleware::new(credentials))
            .with(UnauthorizedMiddleware::new(unauthorized))
            .build();

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = message_from_body(&body);
            return Err(if status == reqwest::StatusCode::UNAUTHORIZED {
                ApiError::Unauthorized { message }
            } else {
                ApiError::Rejected {
                    status: status.as_u16(),
                    message,
                }
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let body = self.send(request).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `POST /auth/login`
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthPayload> {
        info!(email, "Logging in with credentials");
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let url = self.endpoint(&["auth", "login"])?;
        self.send_json(self.http.post(url).json(&body)).await
    }

    /// `POST /auth/register`
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthPayload> {
        info!(email = %request.email, "Registering account");
        let url = self.endpoint(&["auth", "register"])?;
        self.send_json(self.http.post(url).json(request)).await
    }

    /// `GET /auth/me`, authenticated with `bootstrap_token` instead of the
    /// stored credential.
    pub async fn me(&self, bootstrap_token: &str) -> ApiResult<AuthPayload> {
        let url = self.endpoint(&["auth", "me"])?;
        self.send_json(self.http.get(url).bearer_auth(bootstrap_token))
            .await
    }

    /// `GET /auth/oauth2/success`, authenticated with the identity provider's
    /// credential.
    pub async fn oauth_success(&self, provider_credential: &str) -> ApiResult<AuthPayload> {
        let url = self.endpoint(&["auth", "oauth2", "success"])?;
        self.send_json(self.http.get(url).bearer_auth(provider_credential))
            .await
    }

    /// `PUT /user-profile/{userId}`
    pub async fn update_profile(&self, user_id: &str, profile: &ProfileUpdate) -> ApiResult<()> {
        let url = self.endpoint(&["user-profile", user_id])?;
        self.send(self.http.put(url).json(profile)).await?;
        Ok(())
    }

    /// `DELETE /user/{userId}`
    pub async fn delete_account(&self, user_id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["user", user_id])?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    /// `GET /progress/daily/{userId}?date=YYYY-MM-DD`
    pub async fn daily_progress(&self, user_id: &str, date: NaiveDate) -> ApiResult<DailyProgress> {
        let url = self.endpoint(&["progress", "daily", user_id])?;
        let date = date.format("%Y-%m-%d").to_string();
        self.send_json(self.http.get(url).query(&[("date", date)]))
            .await
    }

    /// `GET /progress/weekly/{userId}?startDate=YYYY-MM-DD`
    pub async fn weekly_progress(
        &self,
        user_id: &str,
        start_date: NaiveDate,
    ) -> ApiResult<WeeklyProgress> {
        let url = self.endpoint(&["progress", "weekly", user_id])?;
        let start_date = start_date.format("%Y-%m-%d").to_string();
        self.send_json(self.http.get(url).query(&[("startDate", start_date)]))
            .await
    }

    /// `POST /food/{userId}`
    pub async fn log_food(
        &self,
        user_id: &str,
        request: &FoodLogRequest,
    ) -> ApiResult<FoodLogResponse> {
        let url = self.endpoint(&["food", user_id])?;
        self.send_json(self.http.post(url).json(request)).await
    }

    /// `DELETE /food/{userId}/{logId}`
    pub async fn delete_food_log(&self, user_id: &str, log_id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["food", user_id, log_id])?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    /// `POST /water/{userId}`
    pub async fn log_water(
        &self,
        user_id: &str,
        request: &WaterLogRequest,
    ) -> ApiResult<WaterLogResponse> {
        let url = self.endpoint(&["water", user_id])?;
        self.send_json(self.http.post(url).json(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoopUnauthorizedHandler;

    struct NoToken;

    impl CredentialProvider for NoToken {
        fn bearer_token(&self) -> Option<String> {
            None
        }
    }

    fn client(base: &str) -> ApiClient {
        ApiClient::new(
            ApiClientConfig {
                base_url: Url::parse(base).unwrap(),
                timeout: Duration::from_secs(5),
            },
            Arc::new(NoToken),
            Arc::new(NoopUnauthorizedHandler),
        )
        .unwrap()
    }

    #[test]
    fn endpoint_appends_segments_to_base_path() {
        let c = client("http://localhost:8080/api");
        assert_eq!(
            c.endpoint(&["auth", "login"]).unwrap().as_str(),
            "http://localhost:8080/api/auth/login"
        );

        let c = client("http://localhost:8080/api/");
        assert_eq!(
            c.endpoint(&["food", "1", "9"]).unwrap().as_str(),
            "http://localhost:8080/api/food/1/9"
        );
    }

    #[test]
    fn endpoint_escapes_path_segments() {
        let c = client("http://localhost:8080/api");
        assert_eq!(
            c.endpoint(&["user", "a/b"]).unwrap().as_str(),
            "http://localhost:8080/api/user/a%2Fb"
        );
    }
}
