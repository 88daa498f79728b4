use axum::{response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Root {
    message: String,
    version: String,
}

// axum handler for `/`, not part of the OpenAPI document
pub async fn root() -> impl IntoResponse {
    Json(Root {
        message: "RedRecon API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
