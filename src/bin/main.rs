#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::net::TcpListener;
    use std::sync::Arc;

    use niney::config;
    use niney::core::db::seed_demo_data;
    use niney::core::memory::MemoryStore;
    use tracing::info;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    pub async fn run() -> anyhow::Result<()> {
        tracing_subscriber::registry()
            .with(EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "niney=info,actix_web=info".into()),
            ))
            .with(tracing_subscriber::fmt::layer())
            .init();

        let store = Arc::new(MemoryStore::new());
        if config::seed_demo_data() {
            seed_demo_data(store.as_ref())?;
        }

        let addr = config::bind_addr();
        let listener = TcpListener::bind(&addr)?;
        info!(%addr, "server listening");

        niney::server::run(listener, store)?.await?;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
