use rocket::{
    fairing::{Fairing, Info, Kind},
    Data, Request, Response,
};
use std::time::SystemTime;
use tracing::{info, warn};

pub struct RequestTimer;

#[derive(Clone)]
struct TimerStart(Option<SystemTime>);

#[rocket::async_trait]
impl Fairing for RequestTimer {
    fn info(&self) -> Info {
        Info {
            name: "Request timing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        if request.uri().to_string().eq("/") {
            return;
        }
        request.local_cache(|| TimerStart(Some(SystemTime::now())));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let url = request.uri().to_string();
        if url.eq("/") {
            return;
        }

        let start = request.local_cache(|| TimerStart(None));
        let elapsed_millis = match start.0 {
            Some(start) => match SystemTime::now().duration_since(start) {
                Ok(duration) => duration.as_millis(),
                Err(error) => {
                    warn!("Failed calculating request duration: {}", error);
                    0
                }
            },
            None => 0,
        };

        info!(
            "{} {} -> {} in {}ms",
            request.method(),
            url,
            response.status().code,
            elapsed_millis
        );
    }
}
