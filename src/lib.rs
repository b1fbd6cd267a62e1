pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod state;

use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};
pub use state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = AppState::new(pool);

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .route("/health", web::get().to(health))
            .service(
                web::scope("/carts")
                    .route("", web::post().to(handlers::carts::create_cart))
                    .route(
                        "/customer/{customer_id}/active",
                        web::get().to(handlers::carts::get_active_cart),
                    )
                    .route("/items/{item_id}", web::put().to(handlers::carts::update_item))
                    .route(
                        "/items/{item_id}",
                        web::delete().to(handlers::carts::remove_item),
                    )
                    .route("/{id}", web::get().to(handlers::carts::get_cart))
                    .route("/{id}/abandon", web::post().to(handlers::carts::abandon_cart))
                    .route("/{id}/items", web::post().to(handlers::carts::add_item))
                    .route("/{id}/items", web::get().to(handlers::carts::list_items))
                    .route("/{id}/coupon", web::post().to(handlers::carts::apply_coupon))
                    .route(
                        "/{id}/coupon",
                        web::delete().to(handlers::carts::clear_coupon),
                    ),
            )
            .service(
                web::scope("/coupons")
                    .route("", web::post().to(handlers::coupons::create_coupon))
                    .route("", web::get().to(handlers::coupons::list_coupons))
                    .route(
                        "/{code}/validate",
                        web::post().to(handlers::coupons::validate_coupon),
                    )
                    .route("/{code}", web::get().to(handlers::coupons::get_coupon))
                    .route("/{code}", web::put().to(handlers::coupons::update_coupon)),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::place_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route(
                        "/customer/{customer_id}/history",
                        web::get().to(handlers::orders::order_history),
                    )
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route(
                        "/{id}/status",
                        web::post().to(handlers::orders::transition_order),
                    )
                    .route("/{id}/cancel", web::post().to(handlers::orders::cancel_order))
                    .route(
                        "/{id}/payments",
                        web::get().to(handlers::orders::list_order_payments),
                    )
                    .route("/{id}/paid", web::get().to(handlers::orders::order_paid)),
            )
            .service(
                web::scope("/payments")
                    .route("", web::post().to(handlers::payments::create_payment))
                    .route("/{id}", web::get().to(handlers::payments::get_payment))
                    .route(
                        "/{id}/approve",
                        web::post().to(handlers::payments::approve_payment),
                    )
                    .route(
                        "/{id}/reject",
                        web::post().to(handlers::payments::reject_payment),
                    )
                    .route(
                        "/{id}/refund",
                        web::post().to(handlers::payments::refund_payment),
                    ),
            )
            .service(
                web::scope("/shipments")
                    .route("", web::post().to(handlers::shipments::create_shipment))
                    .route("", web::get().to(handlers::shipments::list_shipments))
                    .route(
                        "/tracking/{code}",
                        web::get().to(handlers::shipments::get_shipment_by_tracking),
                    )
                    .route("/{id}", web::get().to(handlers::shipments::get_shipment))
                    .route("/{id}", web::put().to(handlers::shipments::update_shipment))
                    .route(
                        "/{id}/status",
                        web::post().to(handlers::shipments::update_shipment_status),
                    ),
            )
            .service(
                web::scope("/products")
                    .route("", web::post().to(handlers::products::create_product))
                    .route("", web::get().to(handlers::products::list_products))
                    .route("/{id}", web::get().to(handlers::products::get_product))
                    .route(
                        "/{id}/variants",
                        web::post().to(handlers::products::create_variant),
                    )
                    .route(
                        "/{id}/variants",
                        web::get().to(handlers::products::list_variants),
                    ),
            )
            .service(
                web::scope("/addresses")
                    .route("", web::post().to(handlers::addresses::create_address))
                    .route("", web::get().to(handlers::addresses::list_addresses))
                    .route("/{id}", web::get().to(handlers::addresses::get_address)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", handlers::ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
