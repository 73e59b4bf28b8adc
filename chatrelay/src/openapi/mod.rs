//! OpenAPI documentation for the relay API, rendered with Scalar at `/api/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::errors::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "chatrelay",
        description = "Relays chat messages and uploaded files to an OpenAI-compatible completion provider."
    ),
    paths(
        api::handlers::health::health,
        api::handlers::chat::chat,
        api::handlers::upload::upload_file,
    ),
    components(
        schemas(
            api::models::health::HealthResponse,
            api::models::chat::ChatRequest,
            api::models::chat::ChatResponse,
            api::models::upload::UploadResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness check"),
        (name = "chat", description = "Single-turn chat completion. No conversation history is kept between requests."),
        (name = "upload", description = "One-shot analysis of an uploaded text file. Uploaded files are deleted before the response is sent."),
    )
)]
pub struct ApiDoc;
