use crate::{
    api::{employee, leave},
    auth::middleware::auth_middleware,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, get, middleware::from_fn, web};
use anyhow::Context;
use serde_json::json;
use std::sync::Arc;

pub type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiter allowing `requests_per_min` with an equal burst.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let per_ms = (60_000 / u64::from(requests_per_min.max(1))).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limiter configuration")?;
    Ok(Arc::new(Governor::new(&cfg)))
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str, limiter: Limiter) {
    // Public routes
    cfg.service(health);

    // Protected routes
    cfg.service(
        web::scope(api_prefix)
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(limiter) // rate limiting
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave::my_leave_requests))
                            .route(web::post().to(leave::submit_leave)),
                    )
                    .service(web::resource("/balance").route(web::get().to(leave::my_balance)))
                    .service(web::resource("/accruals").route(web::get().to(leave::my_accruals)))
                    .service(
                        web::resource("/validate").route(web::post().to(leave::validate_leave)),
                    )
                    // /leave/{id}/cancel
                    .service(
                        web::resource("/{id}/cancel").route(web::put().to(leave::cancel_leave)),
                    ),
            )
            .service(
                web::scope("/employees")
                    // /employees/me
                    .service(
                        web::resource("/me")
                            .route(web::get().to(employee::my_profile))
                            .route(web::put().to(employee::update_my_profile)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .service(web::resource("/stats").route(web::get().to(employee::admin_stats)))
                    // /admin/employees
                    .service(
                        web::resource("/employees")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /admin/employees/{id}
                    .service(
                        web::resource("/employees/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee)),
                    )
                    .service(
                        web::resource("/employees/{id}/leave/accruals")
                            .route(web::post().to(leave::process_accruals)),
                    )
                    .service(
                        web::resource("/employees/{id}/leave/deduct")
                            .route(web::post().to(leave::deduct_leave)),
                    )
                    // /admin/leave
                    .service(web::resource("/leave").route(web::get().to(leave::leave_list)))
                    .service(
                        web::resource("/leave/{id}/approve")
                            .route(web::put().to(leave::approve_leave)),
                    )
                    .service(
                        web::resource("/leave/{id}/deny").route(web::put().to(leave::deny_leave)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_configured_rates() {
        assert!(build_limiter(1000).is_ok());
        assert!(build_limiter(1).is_ok());
    }
}
