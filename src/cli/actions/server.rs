use crate::{
    api,
    auth::{AuthConfig, AuthState},
    cli::commands::{auth, storage},
    db::{MemoryStore, MongoStore, Store},
};
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub storage: storage::Options,
    pub auth: auth::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the store cannot be prepared or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let store: Arc<dyn Store> = match args.storage {
        storage::Options::Mongo {
            uri,
            database,
            timeout,
        } => {
            let store = MongoStore::new(uri, database, timeout);
            // A failed warm-up is not fatal, every call retries the connection.
            if let Err(err) = store.connect().await {
                warn!("MongoDB is not reachable yet: {err}");
            }
            Arc::new(store)
        }
        storage::Options::Memory => {
            info!("Using in-memory storage, data is lost on restart");
            Arc::new(MemoryStore::default())
        }
    };

    let auth_config = AuthConfig::new(args.auth.jwt_secret.expose_secret().as_bytes())
        .with_token_ttl_minutes(args.auth.token_ttl_minutes)
        .with_bcrypt_cost(args.auth.bcrypt_cost);

    let auth_state = Arc::new(AuthState::new(auth_config));

    let cors = api::cors_layer(&args.cors_origins).context("Invalid CORS configuration")?;

    api::new(args.port, store, auth_state, cors).await
}
