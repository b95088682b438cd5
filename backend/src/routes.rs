use std::io::Write;

use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::error;
use shared::{ErrorResponse, HealthResponse};

use crate::config::ServiceConfig;
use crate::inference::config::InferenceConfig;
use crate::inference::model::ModelRegistry;
use crate::inference::{classification, preprocess, respond, segmentation};

pub fn configure_routes(cfg: &mut web::ServiceConfig, static_dir: String) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/api/health").route(web::get().to(health)))
        .service(web::resource("/api/predict").route(web::post().to(predict)))
        .service(Files::new("/static", static_dir));
}

async fn index(config: web::Data<ServiceConfig>) -> HttpResponse {
    match std::fs::read_to_string(format!("{}/index.html", config.static_dir)) {
        Ok(page) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(page),
        Err(_) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(
                "<!DOCTYPE html><html><head>\
                 <meta http-equiv=\"refresh\" content=\"0; url=/static/index.html\">\
                 </head><body><p>Redirecting to the interface...</p></body></html>",
            ),
    }
}

async fn health(registry: web::Data<ModelRegistry>) -> HttpResponse {
    let message = if registry.degraded() {
        "Service operational; one or more models are running as fallbacks".to_string()
    } else {
        "Service operational".to_string()
    };
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        classification_loaded: registry.classification_loaded(),
        segmentation_loaded: registry.segmentation_loaded(),
        message,
    })
}

async fn predict(
    registry: web::Data<ModelRegistry>,
    config: web::Data<InferenceConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let Some(classifier) = registry.classifier() else {
        return Ok(server_error("No classification model is loaded"));
    };

    let mut image_data: Vec<u8> = Vec::new();
    while let Ok(Some(mut field)) = payload.try_next().await {
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            data.write_all(&chunk?)?;
        }
        if !data.is_empty() {
            image_data = data;
            break;
        }
    }

    if image_data.is_empty() {
        return Ok(server_error("No image file in upload"));
    }

    let image = match preprocess::decode_image(&image_data) {
        Ok(image) => image,
        Err(e) => {
            error!("Failed to decode upload: {}", e);
            return Ok(server_error(&e.to_string()));
        }
    };

    let classification = match classification::classify_image(classifier, &image, &config) {
        Ok(report) => report,
        Err(e) => {
            error!("Classification failed: {}", e);
            return Ok(server_error(&e.to_string()));
        }
    };

    let segmentation = segmentation::segment_and_overlay(registry.segmenter(), &image, &config);

    match respond::assemble_response(classification, segmentation, &image, &config) {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => {
            error!("Failed to encode response images: {}", e);
            Ok(server_error(&e.to_string()))
        }
    }
}

fn server_error(error: &str) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: error.to_string(),
        success: false,
        message: "Error while processing the image".to_string(),
    })
}
