use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("File must be an image")]
    NotAnImage,
    #[error("Missing file field")]
    MissingFile,
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),
    #[error("Upload exceeds {0} bytes")]
    TooLarge(usize),
    #[error("Invalid image data")]
    InvalidImage(#[source] image::ImageError),
    #[error("Inference failed: {0:#}")]
    Inference(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotAnImage | ApiError::MalformedUpload(_) | ApiError::InvalidImage(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}
