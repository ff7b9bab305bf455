use crate::{
    api::{attendance, documents, employee, holiday, leave_request},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::ApiError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{
    middleware::{Condition, from_fn},
    web,
};
use std::sync::Arc;

/// Documents above this size are refused.
const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

fn build_limiter(requests_per_min: u32) -> Option<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .map(|cfg| Arc::new(Governor::new(&cfg)))
}

/// Per-route limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    enabled: bool,
    login: Limiter,
    refresh: Limiter,
    protected: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let build = |per_min: u32| {
            build_limiter(per_min)
                .ok_or_else(|| anyhow::anyhow!("invalid rate limit of {per_min} per minute"))
        };
        Ok(Self {
            enabled: config.rate_limit_enabled,
            login: build(config.rate_login_per_min)?,
            refresh: build(config.rate_refresh_per_min)?,
            protected: build(config.rate_protected_per_min)?,
        })
    }
}

/// Extractor failures answer with the same JSON error body as handlers.
fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        ApiError::bad_request("invalid_body", err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _| {
        ApiError::bad_request("invalid_query", err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _| {
        ApiError::not_found(err.to_string()).into()
    }))
    .app_data(web::PayloadConfig::new(MAX_DOCUMENT_BYTES));
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: Limiters) {
    let Limiters {
        enabled: limited,
        login: login_limiter,
        refresh: refresh_limiter,
        protected: protected_limiter,
    } = limiters;

    extractor_config(cfg);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Condition::new(limited, login_limiter.clone()))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Condition::new(limited, refresh_limiter))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Condition::new(limited, login_limiter))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(Condition::new(limited, protected_limiter))
            .service(web::resource("/documents").route(web::post().to(documents::upload_document)))
            .service(
                web::scope("/requests")
                    // /requests
                    .service(
                        web::resource("")
                            .route(web::post().to(leave_request::submit_request))
                            .route(web::get().to(leave_request::list_requests)),
                    )
                    // /requests/{id}/review
                    .service(
                        web::resource("/{id}/review")
                            .route(web::get().to(leave_request::review_request)),
                    )
                    // /requests/{id}/decision
                    .service(
                        web::resource("/{id}/decision")
                            .route(web::put().to(leave_request::decide_request)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::post().to(attendance::check_in))
                            .route(web::put().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/remote")
                            .route(web::post().to(attendance::record_remote_activity)),
                    )
                    .service(
                        web::resource("/summary").route(web::get().to(attendance::monthly_summary)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(web::resource("/{id}").route(web::get().to(employee::get_employee)))
                    .service(
                        web::resource("/{id}/account")
                            .route(web::post().to(employee::create_account)),
                    ),
            )
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::post().to(holiday::create_holiday))
                            .route(web::get().to(holiday::list_holidays)),
                    )
                    .service(
                        web::resource("/{date}").route(web::delete().to(holiday::delete_holiday)),
                    ),
            ),
    );
}

// Token flow:
//   POST /auth/login    -> access (ACCESS_TOKEN_TTL) + refresh (REFRESH_TOKEN_TTL)
//   /api/*              -> Authorization: Bearer <access>
//   POST /auth/refresh  -> Bearer <refresh>; the old refresh jti is revoked, a new pair issued
//   POST /auth/logout   -> Bearer <refresh>; revokes it
