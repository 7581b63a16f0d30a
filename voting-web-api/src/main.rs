mod cors;
mod dto;
mod flow;
mod ledger;
mod maintenance;
mod paypal;
mod paystack;
mod pool;
mod pricing;
mod routes;
mod timing;

use dto::{ResponseData, RESPONSE_BAD_REQUEST, RESPONSE_INTERNAL_ERROR};
use pool::Db;
use rocket::{serde::json::Json, Config, Request};
use sea_orm_rocket::Database;
use std::collections::HashSet;
use std::time::Duration;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

#[macro_use]
extern crate rocket;

#[get("/")]
async fn health_ping() -> &'static str {
    ""
}

#[get("/maintenance_mode")]
async fn maintenance_mode() -> Json<ResponseData<&'static str>> {
    let response = ResponseData {
        code: Some(503),
        status_code: None,
        message: "".to_string(),
        data: None,
    };
    Json(response)
}

#[catch(404)]
async fn bad_request(req: &Request<'_>) -> Json<ResponseData<String>> {
    let message = format!("Couldn't find '{}'", req.uri());
    Json(ResponseData::new(RESPONSE_BAD_REQUEST, message, None))
}

#[catch(500)]
async fn internal_error() -> Json<ResponseData<String>> {
    Json(ResponseData::new(
        RESPONSE_INTERNAL_ERROR,
        "Whoops! Looks like we messed up.".to_owned(),
        None,
    ))
}

#[catch(422)]
async fn malformed_body() -> Json<ResponseData<String>> {
    Json(ResponseData::new(
        RESPONSE_BAD_REQUEST,
        "Request body is malformed or fields have the wrong type.".to_owned(),
        None,
    ))
}

#[launch]
async fn rocket() -> _ {
    let voting_config = Config::figment().extract::<pool::VotingConfig>().unwrap();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", &voting_config.rust_log);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                format!("voting_web_api={}", &voting_config.web_api_log)
                    .parse()
                    .expect("Error parsing directive"),
            ),
        )
        .with_span_events(FmtSpan::FULL)
        .init();

    // A hung provider call must surface as "verification unknown", never
    // hold the request open indefinitely.
    let provider_timeout = Duration::from_secs(match voting_config.provider_timeout_secs {
        Some(v) => v,
        None => 15,
    });
    let reqwest_client = reqwest::Client::builder()
        .timeout(provider_timeout)
        .build()
        .expect("Reqwest client failed to initialize!");

    let allowed_domains: HashSet<String> = voting_config
        .cors_allowed_domains
        .split(',')
        .map(|s| s.to_owned())
        .collect();

    rocket::build()
        .register("/", catchers![internal_error, bad_request, malformed_body])
        .attach(Db::init())
        .attach(timing::RequestTimer)
        .attach(maintenance::MaintenanceMode)
        .manage(voting_config)
        .manage(reqwest_client)
        .attach(cors::OriginHeader { allowed_domains })
        .attach(routes::mount())
        .mount("/", routes![health_ping, maintenance_mode])
}
