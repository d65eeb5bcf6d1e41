use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::AuthService;
use crate::error::json_error_handler;
use crate::middleware::JwtMiddleware;
use crate::routes::{get_current_user, health_check, login, refresh, revoke, Shutdown};

pub fn run(
    listener: TcpListener,
    auth: AuthService,
    shutdown: Shutdown,
) -> Result<Server, std::io::Error> {
    let codec = auth.access_tokens().clone();
    let auth = web::Data::new(auth);
    let shutdown = web::Data::new(shutdown);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(auth.clone())
            .app_data(shutdown.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(
                web::scope("/api")
                    // Public routes
                    .route("/healthz", web::get().to(health_check))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/revoke", web::post().to(revoke))
                    // Protected routes (require JWT authentication)
                    .service(
                        web::resource("/me")
                            .wrap(JwtMiddleware::new(codec.clone()))
                            .route(web::get().to(get_current_user)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
