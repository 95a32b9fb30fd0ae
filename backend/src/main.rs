use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use fruits_backend::{AppConfig, DeepstackClient, FruitPredictor, OnnxClassifier, configure_routes};
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let remote = DeepstackClient::new(
        config.deepstack_base_url.clone(),
        config.deepstack_model_name.clone(),
        config.deepstack_timeout,
    )
    .map_err(|e| {
        log::error!("Failed to build DeepStack HTTP client: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    let local = OnnxClassifier::new(config.local_model_path.clone(), config.local_config_path.clone());

    log::info!(
        "DeepStack endpoint: {} (timeout {:?})",
        remote.endpoint(),
        config.deepstack_timeout
    );
    if config.enable_local_onnx_fallback {
        log::info!(
            "Local ONNX fallback enabled: model={} config={}",
            config.local_model_path.display(),
            config.local_config_path.display()
        );
    } else {
        log::warn!("Local ONNX fallback disabled; a missing DeepStack endpoint will be reported as 404");
    }

    let predictor = web::Data::new(FruitPredictor::new(
        remote,
        local,
        config.enable_local_onnx_fallback,
    ));
    let bind_address = format!("0.0.0.0:{}", config.port);
    let config = web::Data::new(config);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(predictor.clone())
            .app_data(config.clone())
            .configure(configure_routes::<DeepstackClient, OnnxClassifier>)
    })
    .bind(&bind_address)?
    .run()
    .await
}
