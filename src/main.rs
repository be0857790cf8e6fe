use std::{fs::OpenOptions, io, sync::Arc};

use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{debug, info};

use crate::{
    accounts::AccountService,
    auth::TokenCodec,
    config::{Config, LoggerConfig},
    db::{FileStore, UserStore},
    error::ApiError,
    media::UploadLimit,
    storage::{ObjectStorage, S3Storage},
    uploads::UploadService,
};

mod accounts;
mod auth;
mod config;
mod db;
mod error;
mod health;
mod media;
mod model;
mod storage;
#[cfg(test)]
mod testing;
mod uploads;
mod users;
mod util;
mod validation;

/// Everything under `/api/v1`.
pub fn api(cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default().error_handler(|err, _| {
        debug!("rejected json body: {err}");
        ApiError::BadRequest("invalid request payload".into()).into()
    });

    let path = web::PathConfig::default().error_handler(|err, _| {
        debug!("rejected path: {err}");
        ApiError::BadRequest("invalid id".into()).into()
    });

    let scope = web::scope("/api/v1")
        .app_data(json)
        .app_data(path)
        .configure(health::configure)
        .configure(users::configure)
        .configure(media::configure);

    cfg.service(scope);
}

fn init_logging(config: &LoggerConfig) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::new().default_filter_or(&config.level));

    if let Some(path) = &config.file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();

    Ok(())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env().map_err(io::Error::other)?;

    init_logging(&config.logger)?;
    debug!("{config:?}");

    let pool = db::connect(&config.database)
        .await
        .map_err(io::Error::other)?;

    let storage: Arc<dyn ObjectStorage> = Arc::new(S3Storage::new(&config.storage));
    let tokens = Arc::new(TokenCodec::new(&config.jwt));

    let accounts = AccountService::new(UserStore::new(pool.clone()), tokens.clone());
    let uploads = UploadService::new(
        UserStore::new(pool.clone()),
        FileStore::new(pool.clone()),
        storage,
        config.storage.public_url.clone(),
    );
    let limit = UploadLimit(config.storage.max_upload_size);

    info!("listening on {}", config.server.address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new(
                "%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %T",
            ))
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::from(tokens.clone()))
            .app_data(web::Data::new(accounts.clone()))
            .app_data(web::Data::new(uploads.clone()))
            .app_data(web::Data::new(limit))
            .configure(api)
    })
    .client_request_timeout(config.server.read_timeout)
    .client_disconnect_timeout(config.server.write_timeout)
    .keep_alive(config.server.idle_timeout)
    .shutdown_timeout(10)
    .bind(config.server.address.as_str())?
    .run()
    .await
}
