use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use anyhow::anyhow;
use std::future::{ready, Ready};
use subtle::ConstantTimeEq;
use tracing::warn;

/// Proof that the request carried the configured API key.
///
/// Taking `ApiKey` as a handler argument rejects the request with 401
/// before the handler body runs.
pub struct ApiKey;

impl ApiKey {
    /// Compare the configured header against the expected key in constant time
    pub fn verify(config: &ServerConfig, req: &HttpRequest) -> Result<ApiKey, ApiError> {
        let provided = req
            .headers()
            .get(&config.api_header)
            .map(|value| value.as_bytes());

        match provided {
            Some(value) if bool::from(value.ct_eq(config.api_key.as_bytes())) => Ok(ApiKey),
            Some(_) => {
                warn!(path = %req.path(), "Rejected request with invalid API key");
                Err(ApiError::Unauthorized)
            }
            None => {
                warn!(
                    path = %req.path(),
                    header = %config.api_header,
                    "Rejected request without API key header"
                );
                Err(ApiError::Unauthorized)
            }
        }
    }
}

impl FromRequest for ApiKey {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<AppState>>() {
            Some(state) => Self::verify(&state.config, req),
            None => Err(ApiError::Internal(anyhow!("Application state is not configured"))),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_utils::{test_config, API_HEADER, API_KEY};
    use actix_web::test::TestRequest;
    use std::path::Path;

    fn config() -> ServerConfig {
        test_config(Path::new("assets"), "development")
    }

    #[test]
    fn test_matching_key_is_accepted() {
        let req = TestRequest::default()
            .insert_header((API_HEADER, API_KEY))
            .to_http_request();
        assert!(ApiKey::verify(&config(), &req).is_ok());
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        let req = TestRequest::default()
            .insert_header(("X-API-KEY", API_KEY))
            .to_http_request();
        assert!(ApiKey::verify(&config(), &req).is_ok());
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let req = TestRequest::default()
            .insert_header((API_HEADER, "wrong"))
            .to_http_request();
        assert!(matches!(
            ApiKey::verify(&config(), &req),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn test_key_prefix_is_rejected() {
        let req = TestRequest::default()
            .insert_header((API_HEADER, &API_KEY[..4]))
            .to_http_request();
        assert!(ApiKey::verify(&config(), &req).is_err());
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(
            ApiKey::verify(&config(), &req),
            Err(ApiError::Unauthorized)
        ));
    }
}
