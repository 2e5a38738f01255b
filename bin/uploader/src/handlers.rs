//! HTTP request handlers

pub mod health;
pub mod upload;

use crate::error::ApiError;
use actix_web::{web, HttpResponse};

/// Register every route plus the catch-all 404
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload::upload)
        .service(health::health)
        .default_service(web::to(not_found));
}

async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::app;
    use crate::config::test_utils::{test_config, API_HEADER, API_KEY, ROOT_CID};
    use crate::state::AppState;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use common::{ErrorEnvelope, HealthResponse, UploadResponse};
    use ipfs::{Ipfs, MemoryIpfs};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    const METADATA: &str = r#"{"name":"CHIBI #7","image":"ipfs://QmdttDSCMFk3o6vseaNGjimQ2VFCfkcqwdv2uvjAmNQKxC"}"#;

    macro_rules! init_app {
        ($state:expr) => {
            test::init_service(app($state)).await
        };
    }

    struct Fixture {
        assets: TempDir,
        ipfs: Arc<MemoryIpfs>,
    }

    impl Fixture {
        fn new() -> Self {
            let assets = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(assets.path().join("json")).unwrap();
            Self {
                assets,
                ipfs: Arc::new(MemoryIpfs::new(ROOT_CID)),
            }
        }

        fn with_metadata(self, token_id: &str, content: &str) -> Self {
            let path = self.assets.path().join("json").join(format!("{}.json", token_id));
            std::fs::write(path, content).unwrap();
            self
        }

        fn state(&self, environment: &str) -> web::Data<AppState> {
            let config = test_config(self.assets.path(), environment);
            let ipfs: Arc<dyn Ipfs> = self.ipfs.clone();
            web::Data::new(AppState::new(Arc::new(config), ipfs))
        }

        fn assets_path(&self) -> &Path {
            self.assets.path()
        }
    }

    fn upload_request(token_id: &str) -> test::TestRequest {
        test::TestRequest::get()
            .uri(&format!("/api/upload/{}", token_id))
            .insert_header((API_HEADER, API_KEY))
    }

    #[actix_web::test]
    async fn test_upload_writes_metadata_verbatim() {
        let fixture = Fixture::new().with_metadata("7", METADATA);
        let app = init_app!(fixture.state("development"));

        let resp = test::call_service(&app, upload_request("7").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: UploadResponse = test::read_body_json(resp).await;
        assert_eq!(body, UploadResponse::success());

        let writes = fixture.ipfs.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "/7.json");
        assert_eq!(writes[0].1, METADATA.as_bytes());
    }

    #[actix_web::test]
    async fn test_upload_overwrites_previous_content() {
        let fixture = Fixture::new().with_metadata("7", METADATA);
        let app = init_app!(fixture.state("development"));

        test::call_service(&app, upload_request("7").to_request()).await;
        std::fs::write(fixture.assets_path().join("json/7.json"), "{}").unwrap();
        let resp = test::call_service(&app, upload_request("7").to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(fixture.ipfs.file("/7.json").unwrap(), b"{}".to_vec());
    }

    #[actix_web::test]
    async fn test_missing_metadata_file_is_silent_success() {
        let fixture = Fixture::new();
        let app = init_app!(fixture.state("development"));

        let resp = test::call_service(&app, upload_request("404").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: UploadResponse = test::read_body_json(resp).await;
        assert!(body.success);
        assert_eq!(body.message, "Success");
        assert!(fixture.ipfs.writes().is_empty());
    }

    #[actix_web::test]
    async fn test_missing_api_key_is_unauthorized() {
        let fixture = Fixture::new().with_metadata("7", METADATA);
        let app = init_app!(fixture.state("development"));

        let req = test::TestRequest::get().uri("/api/upload/7").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: ErrorEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.code, 401);
        assert_eq!(body.title, "UNAUTHORIZED");
        assert!(fixture.ipfs.writes().is_empty());
    }

    #[actix_web::test]
    async fn test_wrong_api_key_is_unauthorized() {
        let fixture = Fixture::new().with_metadata("7", METADATA);
        let app = init_app!(fixture.state("development"));

        let req = test::TestRequest::get()
            .uri("/api/upload/7")
            .insert_header((API_HEADER, "not-the-key"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(fixture.ipfs.writes().is_empty());
    }

    #[actix_web::test]
    async fn test_ipfs_failure_includes_stack_outside_production() {
        let fixture = Fixture::new().with_metadata("7", METADATA);
        fixture.ipfs.fail_with("connection refused");
        let app = init_app!(fixture.state("development"));

        let resp = test::call_service(&app, upload_request("7").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: ErrorEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.code, 500);
        assert_eq!(body.title, "Internal Server Error");
        assert!(body.message.contains("connection refused"));
        let stack = body.stack.expect("stack outside production");
        assert!(stack.iter().any(|line| line == "connection refused"));
    }

    #[actix_web::test]
    async fn test_ipfs_failure_hides_stack_in_production() {
        let fixture = Fixture::new().with_metadata("7", METADATA);
        fixture.ipfs.fail_with("connection refused");
        let app = init_app!(fixture.state("production"));

        let resp = test::call_service(&app, upload_request("7").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body.get("stack").is_none());
        assert_eq!(body["code"], 500);
    }

    #[actix_web::test]
    async fn test_unreadable_metadata_is_server_error() {
        let fixture = Fixture::new();
        // A directory where the metadata file should be
        std::fs::create_dir_all(fixture.assets_path().join("json/9.json")).unwrap();
        let app = init_app!(fixture.state("development"));

        let resp = test::call_service(&app, upload_request("9").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(fixture.ipfs.writes().is_empty());
    }

    #[actix_web::test]
    async fn test_encoded_separator_is_rejected() {
        let fixture = Fixture::new();
        std::fs::write(fixture.assets_path().join("secret.json"), "{}").unwrap();
        let app = init_app!(fixture.state("development"));

        let resp = test::call_service(&app, upload_request("..%2Fsecret").to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.title, "VALIDATION_ERROR");
        assert_eq!(body.message, "Token ID cannot contain path separators (/ or \\)");
        assert!(fixture.ipfs.writes().is_empty());
    }

    #[actix_web::test]
    async fn test_dot_dot_token_id_is_a_plain_file_name() {
        let fixture = Fixture::new().with_metadata("..", METADATA);
        let app = init_app!(fixture.state("development"));

        let resp = test::call_service(&app, upload_request("..").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let writes = fixture.ipfs.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, "/...json");
    }

    #[actix_web::test]
    async fn test_unknown_route_is_not_found() {
        let fixture = Fixture::new();
        let app = init_app!(fixture.state("development"));

        let req = test::TestRequest::get().uri("/api/download/7").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: ErrorEnvelope = test::read_body_json(resp).await;
        assert_eq!(body.code, 404);
        assert_eq!(body.title, "Not Found");
        assert_eq!(body.message, "No endpoints found");
    }

    #[actix_web::test]
    async fn test_health() {
        let fixture = Fixture::new();
        let app = init_app!(fixture.state("production"));

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: HealthResponse = test::read_body_json(resp).await;
        assert_eq!(body.status, "ok");
    }
}
