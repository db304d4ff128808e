use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod db;
pub mod doctype;
pub mod document;
pub mod error;
pub mod renderer;
pub mod storage;
pub mod template;

pub use crate::db::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

/// Registers the API scope and the blob-serving route. Shared by the server
/// and the integration tests.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::resource("/templates")
                    .route(web::get().to(template::handlers::list_templates))
                    .route(web::post().to(template::handlers::create_template)),
            )
            .service(
                web::resource("/templates/placeholders")
                    .route(web::post().to(template::handlers::extract_placeholders)),
            )
            .service(
                web::resource("/templates/{id}")
                    .route(web::get().to(template::handlers::get_template))
                    .route(web::put().to(template::handlers::update_template))
                    .route(web::delete().to(template::handlers::delete_template)),
            )
            .service(
                web::resource("/documents")
                    .route(web::get().to(document::handlers::list_documents)),
            )
            .service(
                web::resource("/documents/generate")
                    .route(web::post().to(document::handlers::generate_document)),
            )
            .service(
                web::resource("/documents/{id}/review")
                    .route(web::post().to(document::handlers::review_document)),
            )
            .service(
                web::resource("/documents/{id}")
                    .route(web::get().to(document::handlers::get_document))
                    .route(web::delete().to(document::handlers::delete_document)),
            )
            .service(
                web::resource("/document-types")
                    .route(web::get().to(doctype::handlers::list_document_types))
                    .route(web::post().to(doctype::handlers::create_document_type)),
            )
            .service(
                web::resource("/document-types/{name}")
                    .route(web::delete().to(doctype::handlers::delete_document_type)),
            ),
    )
    .service(
        web::resource("/documents/serve/{key:.*}")
            .route(web::get().to(document::handlers::serve_document)),
    );
}

pub async fn run() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    #[derive(OpenApi)]
    #[openapi(
        paths(
            crate::template::handlers::list_templates,
            crate::template::handlers::create_template,
            crate::template::handlers::get_template,
            crate::template::handlers::update_template,
            crate::template::handlers::delete_template,
            crate::template::handlers::extract_placeholders,
            crate::document::handlers::generate_document,
            crate::document::handlers::list_documents,
            crate::document::handlers::get_document,
            crate::document::handlers::delete_document,
            crate::document::handlers::review_document,
            crate::doctype::handlers::list_document_types,
            crate::doctype::handlers::create_document_type,
            crate::doctype::handlers::delete_document_type
        ),
        components(
            schemas(
                template::models::Template,
                document::models::DocumentRecord,
                document::models::DocumentKind,
                document::models::ApprovalState,
                document::models::ApprovalStatus,
                document::models::GenerateDocumentRequest,
                document::models::GenerateDocumentResponse,
                document::models::ReviewRequest,
                doctype::models::DocumentType,
                doctype::models::CreateDocumentTypeRequest,
                ErrorResponse,
            )
        ),
        tags(
            (name = "Template Service", description = "Document template CRUD and placeholder extraction."),
            (name = "Document Service", description = "Document generation, review and serving."),
            (name = "Document Type Service", description = "Dynamic document category configuration.")
        ),
        servers(
            (url = "http://127.0.0.1:8080", description = "Localhost Staging server")
        )
    )]
    struct ApiDoc;

    dotenvy::dotenv().ok(); // Load .env file
    let app_state = match AppState::new().await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialise application state. Check SUPABASE_DATABASE_URL, SUPABASE_URL and RENDERER_SERVICE_URL in .env. Error: {}", e);
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("solardocs_server")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus metrics middleware");

    log::info!("Starting server at http://0.0.0.0:8080");

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .configure(configure_api)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .backlog(8192)
    .max_connections(25000)
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(("0.0.0.0", 8080))?
    .run()
    .await
}
