use crate::auth::jwt::verify_token;
use crate::auth::user::AuthUser;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({ "message": message }));
    req.into_response(resp.map_into_boxed_body())
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();

    let header = req
        .headers()
        .get("Authorization")
        .map(|h| h.to_str().map(str::to_owned));

    let header_value = match header {
        Some(Ok(v)) => v,
        Some(Err(_)) => return Ok(unauthorized(req, "Invalid Authorization header encoding")),
        None => return Ok(unauthorized(req, "Missing Authorization header")),
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Ok(unauthorized(
            req,
            "Authorization header must start with Bearer",
        ));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            return Ok(unauthorized(req, "Invalid or expired token"));
        }
    };

    req.extensions_mut().insert(AuthUser {
        role: claims.role,
        employee_id: claims.employee_id,
    });

    next.call(req).await
}
