use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{App, HttpServer};
use tracing::info;

use shareplate_server::infrastructure::config::AppConfig;
use shareplate_server::infrastructure::logging::init_logging;
use shareplate_server::presentation::middleware::{RequestIdMiddleware, TimingMiddleware};
use shareplate_server::presentation::server::{build_cors, build_services, configure};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env()?;
    let services = build_services(&config).await?;

    let bind_address = (config.host.clone(), config.port);
    info!(
        host = %bind_address.0,
        port = bind_address.1,
        backend = ?config.backend,
        "HTTP server starting"
    );

    HttpServer::new(move || {
        let cors = build_cors(&config);

        // RequestId wraps Timing so the completion log carries the id
        App::new()
            .wrap(Logger::default())
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Referrer-Policy", "no-referrer"))
                    .add(("Permissions-Policy", "geolocation=(self)"))
                    .add(("Cross-Origin-Opener-Policy", "same-origin")),
            )
            .wrap(cors)
            .configure(|cfg| configure(cfg, &services))
    })
    .bind(bind_address)?
    .run()
    .await?;

    info!("HTTP server stopped");
    Ok(())
}
