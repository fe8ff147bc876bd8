use crate::error::ApiError;
use crate::service::PotholeService;
use actix_multipart::Multipart;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{post, web, HttpRequest, HttpResponse};
use anyhow::anyhow;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use log::warn;
use std::fmt::Display;

/// Largest accepted upload, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(analyze_potholes);
}

/// Measures the potholes in an uploaded image. Takes a multipart form with
/// the image in its `file` part, or the raw image as the request body.
#[post("/analyze-potholes")]
async fn analyze_potholes(
    request: HttpRequest,
    payload: web::Payload,
    limit: web::Data<UploadLimit>,
    service: web::Data<PotholeService>,
) -> Result<HttpResponse, ApiError> {
    let limit = limit.0;
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let body = if content_type.starts_with("multipart/form-data") {
        read_file_field(Multipart::new(request.headers(), payload), limit).await?
    } else if content_type.starts_with("image/") {
        read_limited(payload, limit).await?
    } else {
        return Err(ApiError::NotAnImage);
    };

    let service = service.into_inner();
    let report = tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory(&body)
            .map_err(ApiError::InvalidImage)?
            .to_rgb8();
        service.analyze_image(&image).map_err(ApiError::from)
    })
    .await
    .map_err(|error| ApiError::Inference(anyhow!("Analysis task failed: {error}")))?
    .inspect_err(|error| warn!("Rejected analysis request: {error}"))?;

    Ok(HttpResponse::Ok().json(report.to_response()))
}

/// Bytes of the `file` part. Other parts are skipped.
async fn read_file_field(mut multipart: Multipart, limit: usize) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next().await {
        let field = field.map_err(malformed)?;
        if field.name() != Some("file") {
            continue;
        }

        let is_image = field
            .content_type()
            .map_or(false, |mime| mime.essence_str().starts_with("image/"));
        if !is_image {
            return Err(ApiError::NotAnImage);
        }
        return read_limited(field, limit).await;
    }

    Err(ApiError::MissingFile)
}

async fn read_limited<S, E>(mut stream: S, limit: usize) -> Result<Bytes, ApiError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut body = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(malformed)?;
        if body.len() + chunk.len() > limit {
            return Err(ApiError::TooLarge(limit));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body.freeze())
}

fn malformed(error: impl Display) -> ApiError {
    ApiError::MalformedUpload(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use anyhow::{bail, Result};
    use groundtruth_geometry::{
        AnalysisResponse, DepthMap, GeometryConfig, Mask, PotholeAnalyzer,
    };
    use groundtruth_inference::{DepthEstimation, PotholeSegmentation};
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use std::sync::Arc;

    /// Two disks at detector resolution 200x200, one of them too large to
    /// leave any ring inside the frame.
    struct FakeSegmentation;

    impl PotholeSegmentation for FakeSegmentation {
        fn segment_potholes(&self, _image: &RgbImage) -> Result<Vec<Mask>> {
            let disk = |cx: f64, cy: f64, r: f64| {
                Mask::from_fn(200, 200, move |x, y| {
                    let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                    dx * dx + dy * dy <= r * r
                })
            };
            Ok(vec![
                disk(100.0, 100.0, 20.0),
                Mask::from_fn(200, 200, |_, _| true),
            ])
        }
    }

    /// Road at 2m, 2.3m inside the first disk, at 100x100.
    struct FakeDepth;

    impl DepthEstimation for FakeDepth {
        fn estimate_depth(&self, _image: &RgbImage) -> Result<DepthMap> {
            let values = (0..100 * 100)
                .map(|index| {
                    let (x, y) = ((index % 100) as f64, (index / 100) as f64);
                    let (dx, dy) = (x - 50.0, y - 50.0);
                    if dx * dx + dy * dy <= 100.0 {
                        2.3
                    } else {
                        2.0
                    }
                })
                .collect();
            DepthMap::from_shape_vec(100, 100, values)
        }
    }

    struct BrokenDepth;

    impl DepthEstimation for BrokenDepth {
        fn estimate_depth(&self, _image: &RgbImage) -> Result<DepthMap> {
            bail!("model not loaded")
        }
    }

    fn service(depth: Arc<dyn DepthEstimation>) -> web::Data<PotholeService> {
        web::Data::new(PotholeService::new(
            Arc::new(FakeSegmentation),
            depth,
            PotholeAnalyzer::new(GeometryConfig::default()).unwrap(),
        ))
    }

    fn limit(bytes: usize) -> web::Data<UploadLimit> {
        web::Data::new(UploadLimit(bytes))
    }

    fn png_bytes() -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        RgbImage::new(32, 24)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    const BOUNDARY: &str = "GroundTruthBoundary";

    /// One-part form, laid out the way the reporting backend sends it.
    fn form(name: &str, part_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{name}\"; filename=\"road.png\"\r\n\
             Content-Type: {part_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn form_request(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/analyze-potholes")
            .insert_header((
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
    }

    #[actix_web::test]
    async fn measures_multipart_upload() {
        let app = test::init_service(
            App::new()
                .app_data(service(Arc::new(FakeDepth)))
                .app_data(limit(1 << 20))
                .configure(configure),
        )
        .await;

        let request = form_request(form("file", "image/png", &png_bytes())).to_request();
        let response: AnalysisResponse = test::call_and_read_body_json(&app, request).await;

        assert_eq!(response.pothole_count, 1);
        let record = &response.results[0];
        assert_eq!(record.pothole_id, 0);
        assert_eq!(record.distance_m, 2.0);
        assert_eq!(record.depth_cm, 30.0);
        assert!(record.width_cm > 0.0);
        assert!(response.has_deep_pothole);
    }

    #[actix_web::test]
    async fn measures_raw_image_body() {
        let app = test::init_service(
            App::new()
                .app_data(service(Arc::new(FakeDepth)))
                .app_data(limit(1 << 20))
                .configure(configure),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/analyze-potholes")
            .insert_header((CONTENT_TYPE, "image/png"))
            .set_payload(png_bytes())
            .to_request();
        let response: AnalysisResponse = test::call_and_read_body_json(&app, request).await;

        assert_eq!(response.pothole_count, 1);
        assert_eq!(response.results[0].depth_cm, 30.0);
    }

    #[actix_web::test]
    async fn rejects_non_image_part() {
        let app = test::init_service(
            App::new()
                .app_data(service(Arc::new(FakeDepth)))
                .app_data(limit(1 << 20))
                .configure(configure),
        )
        .await;

        let request = form_request(form("file", "text/plain", b"not a picture")).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["detail"], "File must be an image");
    }

    #[actix_web::test]
    async fn form_without_file_part_is_unprocessable() {
        let app = test::init_service(
            App::new()
                .app_data(service(Arc::new(FakeDepth)))
                .app_data(limit(1 << 20))
                .configure(configure),
        )
        .await;

        let request = form_request(form("photo", "image/png", &png_bytes())).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn rejects_non_image_content_type() {
        let app = test::init_service(
            App::new()
                .app_data(service(Arc::new(FakeDepth)))
                .app_data(limit(1 << 20))
                .configure(configure),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/analyze-potholes")
            .insert_header((CONTENT_TYPE, "application/json"))
            .set_payload("{}")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["detail"], "File must be an image");
    }

    #[actix_web::test]
    async fn rejects_undecodable_bytes() {
        let app = test::init_service(
            App::new()
                .app_data(service(Arc::new(FakeDepth)))
                .app_data(limit(1 << 20))
                .configure(configure),
        )
        .await;

        let request = form_request(form("file", "image/jpeg", &[0u8, 1, 2, 3])).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body["detail"], "Invalid image data");
    }

    #[actix_web::test]
    async fn oversized_upload_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(service(Arc::new(FakeDepth)))
                .app_data(limit(16))
                .configure(configure),
        )
        .await;

        let request = form_request(form("file", "image/png", &png_bytes())).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn provider_failure_is_server_error() {
        let app = test::init_service(
            App::new()
                .app_data(service(Arc::new(BrokenDepth)))
                .app_data(limit(1 << 20))
                .configure(configure),
        )
        .await;

        let request = form_request(form("file", "image/png", &png_bytes())).to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
