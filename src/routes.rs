//! HTTP handlers. One generic body covers all four prediction endpoints:
//! validate query parameters, run the pipeline on the blocking pool, map
//! failures to the 400/500 bodies. Internal error detail is logged here and
//! never reaches the client.

use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use log::{error, info};

use crate::models::ErrorResponse;
use crate::schema::validate;
use crate::service::{PredictionService, Variant};

/// Registers the four prediction endpoints. `main` adds the form page,
/// static files, and the 404 default service on top.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/classify_prk_before_delivery/",
        web::get().to(before_delivery),
    )
    .route("/classify_prk_at_delivery/", web::get().to(at_delivery))
    .route("/classify_prk_with_labs/", web::get().to(with_labs))
    .route("/classify_prk_without_labs/", web::get().to(without_labs));
}

pub async fn before_delivery(
    service: web::Data<PredictionService>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    classify(service, query, Variant::BeforeDelivery).await
}

pub async fn at_delivery(
    service: web::Data<PredictionService>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    classify(service, query, Variant::AtDelivery).await
}

pub async fn with_labs(
    service: web::Data<PredictionService>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    classify(service, query, Variant::WithLabs).await
}

pub async fn without_labs(
    service: web::Data<PredictionService>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    classify(service, query, Variant::WithoutLabs).await
}

async fn classify(
    service: web::Data<PredictionService>,
    query: web::Query<HashMap<String, String>>,
    variant: Variant,
) -> HttpResponse {
    let input = match validate(variant.schema(), &query) {
        Ok(input) => input,
        Err(errors) => {
            info!(
                "rejected `{}` request, invalid fields: {}",
                variant.key(),
                errors.field_names().join(", ")
            );
            return HttpResponse::BadRequest().json(ErrorResponse { error: errors });
        }
    };

    let service = service.clone();
    match web::block(move || service.predict(variant, &input)).await {
        Ok(Ok(result)) => {
            info!(
                "served `{}` prediction: label={}",
                variant.key(),
                result.prediction
            );
            HttpResponse::Ok().json(result)
        }
        Ok(Err(e)) => {
            error!("prediction failed for `{}`: {e:#}", variant.key());
            internal_error()
        }
        Err(e) => {
            error!("blocking call failed for `{}`: {e}", variant.key());
            internal_error()
        }
    }
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: "Internal server error",
    })
}

pub async fn index(req: HttpRequest) -> impl Responder {
    match actix_files::NamedFile::open_async("./static/index.html").await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            error!("failed to open form page: {e}");
            internal_error()
        }
    }
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: "Endpoint not found",
    })
}
