//! Native actix-web front end. Requests are adapted to the Spin types so the
//! same router serves both runtimes.

use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

use crate::core::store::EntityStore;
use crate::handlers;

pub type SharedStore = Arc<dyn EntityStore + Send + Sync>;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        };

        let mut builder = Request::builder();
        builder.method(method).uri(req.uri().to_string());

        // Copy headers
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }

        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: Response) -> actix_web::HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
        let body = spin_resp.body().to_vec();

        let mut response = actix_web::HttpResponse::build(status);
        if !body.is_empty() {
            response.content_type("application/json");
        }
        response.body(body)
    }
}

async fn handle_all(
    req: HttpRequest,
    body: web::Bytes,
    store: web::Data<dyn EntityStore + Send + Sync>,
) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);
    let spin_resp = handlers::route(store.get_ref(), &spin_req);
    adapter::spin_to_actix_response(spin_resp)
}

/// Builds the server on an already bound listener. The returned [`Server`]
/// must be awaited (or spawned) to start serving.
pub fn run(listener: TcpListener, store: SharedStore) -> std::io::Result<Server> {
    let data: web::Data<dyn EntityStore + Send + Sync> = web::Data::from(store);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .default_service(web::route().to(handle_all))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
