pub mod auth;
pub mod config;
pub mod core;
pub mod follow;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod posts;
pub mod stories;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(target_arch = "wasm32")]
use spin_sdk::http::{IntoResponse, Request};

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
#[spin_sdk::http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let store = crate::core::kv::KvStore::open_default()?;
    if config::seed_demo_data() {
        // Initialize demo data on first request
        crate::core::db::seed_demo_data(&store)?;
    }
    Ok(handlers::route(&store, &req))
}
