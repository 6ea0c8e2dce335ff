//! Per-request access logging.

use std::time::Instant;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use tracing::{info, warn};

use crate::session_guards::RequestUser;

#[derive(Clone, Copy)]
struct StartedAt(Option<Instant>);

pub struct RequestLogger;

fn client_ip(req: &Request<'_>) -> String {
    req.client_ip().map(|ip| ip.to_string()).unwrap_or_else(|| "unknown".to_string())
}

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info { name: "Request Logger", kind: Kind::Request | Kind::Response }
    }

    async fn on_request(&self, req: &mut Request<'_>, _: &mut Data<'_>) {
        req.local_cache(|| StartedAt(Some(Instant::now())));
        info!(
            target: "inventory_api::request_log",
            "Request started - Method: {}, Path: {}, IP: {}",
            req.method(),
            req.uri().path(),
            client_ip(req)
        );
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let elapsed = req
            .local_cache(|| StartedAt(None))
            .0
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or_default();
        let user = req
            .local_cache(RequestUser::default)
            .0
            .clone()
            .unwrap_or_else(|| "Anonymous".to_string());
        let status = res.status();

        if status.code >= 400 {
            warn!(
                target: "inventory_api::request_log",
                "Request completed with error - Method: {}, Path: {}, Status: {}, User: {}, IP: {}, Response Time: {:.3}s",
                req.method(),
                req.uri().path(),
                status.code,
                user,
                client_ip(req),
                elapsed
            );
        } else {
            info!(
                target: "inventory_api::request_log",
                "Request completed successfully - Method: {}, Path: {}, Status: {}, User: {}, IP: {}, Response Time: {:.3}s",
                req.method(),
                req.uri().path(),
                status.code,
                user,
                client_ip(req),
                elapsed
            );
        }
    }
}
