use actix_web::{http::StatusCode, web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::response::{error_response, failure, ok};
use super::AppState;
use crate::error::{Result, RoomGenError};
use crate::imaging;
use crate::models::{
    AspectRatio, GenerationRequest, ImageProvider, ImageSize, ModelId, ModelInfo, RoomAnalysis, UpstreamResult,
};
use crate::prompt::{assemble_prompt, room_types, styles, PromptInput};
use crate::storage::ImageStorageManager;
use crate::upstream::codec::{decode_base64, detect_mime_type};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .route("/health", web::get().to(health))
        .route("/output/{file_name}", web::get().to(output_file))
        .service(
            web::scope("/api/v1")
                .route("/generate", web::post().to(generate))
                .route("/generate-async", web::post().to(generate_async))
                .route("/task/{task_id}", web::get().to(task_status))
                .route("/styles", web::get().to(list_styles))
                .route("/room-types", web::get().to(list_room_types))
                .route("/models", web::get().to(list_models))
                .configure(super::segment::configure_routes),
        );
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    /// Base64 or data URL of the room photo.
    pub image: String,
    pub style: String,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub image_size: Option<String>,
    /// Overrides the configured model priority for this request.
    #[serde(default)]
    pub models: Option<Vec<String>>,
    /// Run the vision analysis pass first and fold its recommendations into the prompt.
    #[serde(default)]
    pub analyze: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateData {
    pub task_id: String,
    pub status: &'static str,
    pub input_image: String,
    pub output_urls: Vec<String>,
    pub style: String,
    pub prompt: String,
    pub used_model: ModelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<RoomAnalysis>,
}

#[derive(Debug, Serialize)]
pub struct GenerateAsyncData {
    pub task_id: String,
    pub status: &'static str,
    pub input_image: String,
    pub model: ModelId,
    /// Seconds a client should expect to wait before the result is ready.
    pub estimated_time: u32,
}

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Room renovation renderer is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    let storage_ok = state.storage.health_check().await.unwrap_or(false);
    HttpResponse::Ok().json(serde_json::json!({
        "status": if storage_ok { "healthy" } else { "degraded" },
        "storage": storage_ok,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn output_file(state: web::Data<AppState>, file_name: web::Path<String>) -> HttpResponse {
    match state.storage.load_output(&file_name).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(detect_mime_type(&bytes))
            .body(bytes),
        Err(RoomGenError::StorageError(_)) => failure(StatusCode::NOT_FOUND, "File not found"),
        Err(e) => error_response(&e),
    }
}

async fn list_styles() -> HttpResponse {
    ok(styles())
}

async fn list_room_types() -> HttpResponse {
    ok(room_types())
}

async fn list_models(state: web::Data<AppState>) -> HttpResponse {
    let models: Vec<ModelInfo> = ModelId::ALL.iter().map(ModelId::info).collect();
    ok(serde_json::json!({
        "models": models,
        "default_priority": state.upstream.orchestrator().default_priority(),
    }))
}

pub(crate) fn decode_image_field(field: &str, value: &str) -> Result<Vec<u8>> {
    let bytes = decode_base64(value)
        .map_err(|_| RoomGenError::ValidationError(format!("Field '{}' is not valid base64", field)))?;
    if bytes.is_empty() {
        return Err(RoomGenError::ValidationError(format!("Field '{}' is empty", field)));
    }
    Ok(bytes)
}

/// `auto` and anything unrecognized render as 4:3.
fn route_aspect_ratio(raw: Option<&str>) -> AspectRatio {
    raw.and_then(|value| value.parse::<AspectRatio>().ok())
        .filter(|ratio| *ratio != AspectRatio::Auto)
        .unwrap_or(AspectRatio::Landscape4x3)
}

fn route_image_size(raw: Option<&str>) -> Result<ImageSize> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.parse(),
        None => Ok(ImageSize::default()),
    }
}

fn route_models(raw: Option<&[String]>) -> Result<Vec<ModelId>> {
    raw.unwrap_or_default()
        .iter()
        .map(|model| model.parse::<ModelId>())
        .collect()
}

/// Background tasks only run on the draw-task provider. The first such model
/// in the request wins; without one the standard tier is used.
fn background_model(models: &[ModelId]) -> Result<ModelId> {
    if models.is_empty() {
        return Ok(ModelId::NanoBanana);
    }
    models
        .iter()
        .copied()
        .find(|model| model.provider() == ImageProvider::Grsai)
        .ok_or_else(|| {
            RoomGenError::ValidationError("Background generation needs a nano-banana model".to_string())
        })
}

/// Local checks that must pass before anything is stored or sent upstream.
/// The returned photo is already decoded, shrunk and re-encoded as JPEG.
fn prepare_generation(body: &GenerateBody) -> Result<(Vec<u8>, ImageSize, Vec<ModelId>)> {
    if body.style.trim().is_empty() {
        return Err(RoomGenError::ValidationError("Field 'style' is required".to_string()));
    }
    let image_size = route_image_size(body.image_size.as_deref())?;
    let models = route_models(body.models.as_deref())?;
    let image = imaging::preprocess(&decode_image_field("image", &body.image)?)?;
    Ok((image, image_size, models))
}

fn build_prompt(body: &GenerateBody, analysis: Option<&RoomAnalysis>) -> String {
    assemble_prompt(
        &PromptInput::new(&body.style)
            .with_room_type(body.room_type.as_deref())
            .with_custom_text(body.custom_prompt.as_deref())
            .with_analysis(analysis),
    )
}

async fn generate(state: web::Data<AppState>, body: web::Json<GenerateBody>) -> HttpResponse {
    let body = body.into_inner();

    let (image, image_size, models) = match prepare_generation(&body) {
        Ok(prepared) => prepared,
        Err(e) => return error_response(&e),
    };
    let aspect_ratio = route_aspect_ratio(body.aspect_ratio.as_deref());

    let task_id = ImageStorageManager::new_task_id();
    log::info!(
        "🏠 Generation task {} (style: {}, room: {}, ratio: {}, size: {})",
        task_id,
        body.style,
        body.room_type.as_deref().unwrap_or("-"),
        aspect_ratio.as_str(),
        image_size.as_str()
    );

    let input = match state.storage.save_input(&task_id, &image).await {
        Ok(stored) => stored,
        Err(e) => return error_response(&e),
    };

    let analysis = if body.analyze {
        match state
            .upstream
            .analysis()
            .analyze(
                &image,
                &body.style,
                body.room_type.as_deref(),
                body.custom_prompt.as_deref(),
            )
            .await
        {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                log::warn!("⚠️  Room analysis skipped for task {}: {}", task_id, e);
                None
            }
        }
    } else {
        None
    };

    let prompt = build_prompt(&body, analysis.as_ref());

    let request = match GenerationRequest::builder(prompt.clone())
        .with_reference_image(image)
        .with_aspect_ratio(aspect_ratio)
        .with_image_size(image_size)
        .with_model_priority(models)
        .build()
    {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    let (images, used_model) = match state.upstream.orchestrator().generate_with_fallback(&request).await {
        UpstreamResult::Success { images, model_used } => (images, model_used),
        UpstreamResult::TerminalFailure { reason } => {
            log::error!("🛑 Task {} failed: {}", task_id, reason);
            return failure(StatusCode::BAD_GATEWAY, reason);
        }
        UpstreamResult::RetryableFailure { reason } => {
            log::error!("🛑 Task {} exhausted every model: {}", task_id, reason);
            return failure(StatusCode::SERVICE_UNAVAILABLE, reason);
        }
    };

    let outputs = match state.storage.save_outputs(&task_id, &images).await {
        Ok(outputs) => outputs,
        Err(e) => return error_response(&e),
    };
    log::info!("✅ Task {} produced {} image(s) with {}", task_id, outputs.len(), used_model);

    ok(GenerateData {
        task_id,
        status: "succeeded",
        input_image: input.file_name,
        output_urls: outputs.into_iter().map(|stored| stored.url).collect(),
        style: body.style,
        prompt,
        used_model,
        analysis,
    })
}

async fn generate_async(state: web::Data<AppState>, body: web::Json<GenerateBody>) -> HttpResponse {
    let body = body.into_inner();

    let prepared: Result<(Vec<u8>, ImageSize, ModelId)> = prepare_generation(&body)
        .and_then(|(image, image_size, models)| Ok((image, image_size, background_model(&models)?)));
    let (image, image_size, model) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => return error_response(&e),
    };

    let local_id = ImageStorageManager::new_task_id();
    let input = match state.storage.save_input(&local_id, &image).await {
        Ok(stored) => stored,
        Err(e) => return error_response(&e),
    };

    let request = GenerationRequest::builder(build_prompt(&body, None))
        .with_reference_image(image)
        .with_aspect_ratio(route_aspect_ratio(body.aspect_ratio.as_deref()))
        .with_image_size(image_size)
        .build();
    let task_id = match request {
        Ok(request) => state.upstream.grsai().submit_task(&request, model).await,
        Err(e) => Err(e),
    };

    match task_id {
        Ok(task_id) => ok(GenerateAsyncData {
            task_id,
            status: "processing",
            input_image: input.file_name,
            model,
            estimated_time: 60,
        }),
        Err(e) => error_response(&e),
    }
}

async fn task_status(state: web::Data<AppState>, task_id: web::Path<String>) -> HttpResponse {
    match state.upstream.grsai().task_status(&task_id).await {
        Ok(task) => ok(task),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Config, Credential, GrsaiConfig};
    use crate::imaging::tests::sample_png;
    use crate::models::GeneratedImage;
    use crate::server::{configure, AppState};
    use crate::upstream::{UpstreamContext, UpstreamImageClient};
    use actix_web::{test, App};
    use async_trait::async_trait;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nroom";

    /// Answers every model with the same canned result.
    pub(crate) struct CannedClient(pub UpstreamResult);

    #[async_trait]
    impl UpstreamImageClient for CannedClient {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _request: &GenerationRequest, model: ModelId) -> UpstreamResult {
            match &self.0 {
                UpstreamResult::Success { images, .. } => UpstreamResult::success(images.clone(), model),
                other => other.clone(),
            }
        }
    }

    async fn state_from(config: Config, result: UpstreamResult) -> AppState {
        let upstream = UpstreamContext::with_image_client(&config, Arc::new(CannedClient(result))).unwrap();
        let storage = ImageStorageManager::new(&config).await.unwrap();
        AppState::new(config, upstream, storage)
    }

    pub(crate) async fn state_with(result: UpstreamResult, dir: &std::path::Path) -> AppState {
        let config = Config::new().with_storage_dirs(dir.join("input"), dir.join("output"));
        state_from(config, result).await
    }

    /// Background draw tasks go to `server`; synchronous generation is never reached.
    async fn state_with_draw_server(server: &MockServer, dir: &std::path::Path) -> AppState {
        let config = Config::new()
            .with_storage_dirs(dir.join("input"), dir.join("output"))
            .with_grsai(
                GrsaiConfig::new()
                    .with_base_url(server.uri())
                    .with_credential(Credential::Static("grsai-key".into())),
            );
        state_from(config, UpstreamResult::terminal("unused")).await
    }

    fn generate_body() -> serde_json::Value {
        serde_json::json!({
            "image": crate::upstream::codec::encode_base64(&sample_png(32, 24)),
            "style": "modern_minimalist",
            "room_type": "living_room",
            "custom_prompt": "add (a) piano: black",
        })
    }

    #[actix_web::test]
    async fn test_generate_saves_outputs_and_reports_model() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(
            UpstreamResult::success(vec![GeneratedImage::new(PNG.to_vec(), "image/png")], ModelId::GeminiProImage),
            dir.path(),
        )
        .await;
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let request = test::TestRequest::post()
            .uri("/api/v1/generate")
            .set_json(generate_body())
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(body["code"], 0);
        assert_eq!(body["data"]["status"], "succeeded");
        assert_eq!(body["data"]["used_model"], "gemini-3-pro-image-preview");
        assert!(body["data"]["input_image"].as_str().unwrap().ends_with("_input.jpg"));
        assert!(body["data"]["prompt"]
            .as_str()
            .unwrap()
            .contains("## USER REQUIREMENTS:\nadd a piano black"));

        let url = body["data"]["output_urls"][0].as_str().unwrap().to_string();
        assert!(url.starts_with("/output/"));
        let fetched = test::call_and_read_body(&app, test::TestRequest::get().uri(&url).to_request()).await;
        assert_eq!(fetched.as_ref(), PNG);
    }

    #[actix_web::test]
    async fn test_generate_maps_failures_to_status() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(UpstreamResult::terminal("HTTP 401: denied"), dir.path()).await;
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;
        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/v1/generate").set_json(generate_body()).to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let dir = tempfile::tempdir().unwrap();
        let state = state_with(UpstreamResult::retryable("no candidates"), dir.path()).await;
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;
        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/v1/generate").set_json(generate_body()).to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["code"], -1);
        assert!(body["message"].as_str().unwrap().contains("no candidates"));
    }

    #[actix_web::test]
    async fn test_generate_rejects_bad_input_before_upstream() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(UpstreamResult::terminal("must not be reached"), dir.path()).await;
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let mut body = generate_body();
        body["image"] = serde_json::json!("***not base64***");
        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/v1/generate").set_json(body).to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let mut body = generate_body();
        body["models"] = serde_json::json!(["dall-e-3"]);
        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/v1/generate").set_json(body).to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_generate_rejects_unreadable_image() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(UpstreamResult::terminal("must not be reached"), dir.path()).await;
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let mut body = generate_body();
        body["image"] = serde_json::json!(crate::upstream::codec::encode_base64(
            b"this is a plain text file, not a photo"
        ));
        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/v1/generate").set_json(body).to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert!(body["message"].as_str().unwrap().contains("Unreadable image"));
        assert_eq!(std::fs::read_dir(dir.path().join("input")).unwrap().count(), 0);
    }

    #[actix_web::test]
    async fn test_generate_async_submits_and_task_is_polled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/draw/nano-banana"))
            .and(body_partial_json(serde_json::json!({"model": "nano-banana", "aspectRatio": "4:3"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "data": {"id": "task-7"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/draw/result"))
            .and(body_partial_json(serde_json::json!({"id": "task-7"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": 0,
                "data": {"id": "task-7", "status": "running", "progress": 40}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let state = state_with_draw_server(&server, dir.path()).await;
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let submitted: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/v1/generate-async")
                .set_json(generate_body())
                .to_request(),
        )
        .await;
        assert_eq!(submitted["code"], 0);
        assert_eq!(submitted["data"]["task_id"], "task-7");
        assert_eq!(submitted["data"]["status"], "processing");
        assert_eq!(submitted["data"]["model"], "nano-banana");

        let polled: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/v1/task/task-7").to_request(),
        )
        .await;
        assert_eq!(polled["data"]["status"], "running");
        assert_eq!(polled["data"]["progress"], 40.0);
    }

    #[actix_web::test]
    async fn test_unknown_task_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/draw/result"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": -22,
                "msg": "task not found"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let state = state_with_draw_server(&server, dir.path()).await;
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let response = test::call_service(&app, test::TestRequest::get().uri("/api/v1/task/missing").to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_generate_async_rejects_synchronous_only_models() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let state = state_with_draw_server(&server, dir.path()).await;
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let mut body = generate_body();
        body["models"] = serde_json::json!(["gemini-2.5-flash-image"]);
        let response = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/v1/generate-async").set_json(body).to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_listings() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(UpstreamResult::terminal("unused"), dir.path()).await;
        let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure)).await;

        let styles: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/v1/styles").to_request()).await;
        assert_eq!(styles["data"].as_array().unwrap().len(), 9);

        let rooms: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/v1/room-types").to_request(),
        )
        .await;
        assert_eq!(rooms["data"].as_array().unwrap().len(), 10);

        let models: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/v1/models").to_request()).await;
        assert_eq!(models["data"]["models"].as_array().unwrap().len(), 7);
        assert_eq!(models["data"]["default_priority"][0], "gemini-3-pro-image-preview");
    }

    #[actix_web::test]
    async fn test_route_aspect_ratio_defaults_to_four_three() {
        assert_eq!(route_aspect_ratio(None), AspectRatio::Landscape4x3);
        assert_eq!(route_aspect_ratio(Some("auto")), AspectRatio::Landscape4x3);
        assert_eq!(route_aspect_ratio(Some("7:1")), AspectRatio::Landscape4x3);
        assert_eq!(route_aspect_ratio(Some("16:9")), AspectRatio::Landscape16x9);
    }
}
