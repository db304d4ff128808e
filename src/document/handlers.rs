use crate::db::AppState;
use crate::document::generate::blob_key_from_url;
use crate::document::models::{
    ApprovalStatus, DocumentKind, DocumentRecord, GenerateDocumentRequest,
    GenerateDocumentResponse, ReviewRequest,
};
use crate::error::DocumentError;
use crate::ErrorResponse;
use actix_web::{
    web::{self, Json, Path},
    HttpResponse, Responder,
};
use chrono::Utc;
use log::{debug, error, info};
use uuid::Uuid;

fn generation_error_response(err: &DocumentError) -> HttpResponse {
    match err {
        DocumentError::TemplateUnavailable(_) | DocumentError::NotFound(_) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found(&err.to_string()))
        }
        DocumentError::UnknownCategory(_) => {
            HttpResponse::BadRequest().json(ErrorResponse::bad_request(&err.to_string()))
        }
        DocumentError::Conflict => {
            HttpResponse::Conflict().json(ErrorResponse::new("Conflict", &err.to_string()))
        }
        DocumentError::Render(_) | DocumentError::Storage(_) | DocumentError::Database(_) => {
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&err.to_string()))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    post,
    path = "/documents/generate",
    request_body = GenerateDocumentRequest,
    responses(
        (status = 200, description = "Document generated", body = GenerateDocumentResponse),
        (status = 400, description = "Unknown document category", body = ErrorResponse),
        (status = 404, description = "Template unavailable", body = ErrorResponse),
        (status = 409, description = "Concurrent regeneration won the race", body = ErrorResponse),
        (status = 500, description = "Render or storage failure", body = ErrorResponse)
    )
)]
pub async fn generate_document(
    req: Json<GenerateDocumentRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    info!(
        "Executing generate_document handler for template {}",
        req.template_id
    );

    match data.generator.generate(req.into_inner()).await {
        Ok(outcome) => HttpResponse::Ok().json(GenerateDocumentResponse {
            success: true,
            pdf_url: outcome.pdf_url,
            docx_url: outcome.docx_url,
            document_id: outcome.document_id,
            is_financial_document: outcome.is_financial_document,
        }),
        Err(e) => {
            error!("Document generation failed: {}", e);
            generation_error_response(&e)
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    get,
    path = "/documents",
    responses(
        (status = 200, description = "All generated documents, most recently updated first", body = Vec<DocumentRecord>),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_documents(data: web::Data<AppState>) -> impl Responder {
    debug!("Fetching all documents");
    match data.repo.list_documents().await {
        Ok(documents) => HttpResponse::Ok().json(documents),
        Err(e) => {
            error!("Failed to list documents: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to retrieve documents"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    get,
    path = "/documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document found", body = DocumentRecord),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
pub async fn get_document(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let document_id = id.into_inner();
    match data.repo.get_document(&document_id).await {
        Ok(Some(document)) => HttpResponse::Ok().json(document),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
            "Document with ID {} not found",
            document_id
        ))),
        Err(e) => {
            error!("Failed to get document {}: {}", document_id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to retrieve document"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    delete,
    path = "/documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn delete_document(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let document_id = id.into_inner();
    info!("Executing delete_document handler for {}", document_id);

    let document = match data.repo.get_document(&document_id).await {
        Ok(Some(d)) => d,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
                "Document with ID {} not found",
                document_id
            )));
        }
        Err(e) => {
            error!("Failed to fetch document {}: {}", document_id, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to retrieve document"));
        }
    };

    // Blobs first, best-effort; the record delete proceeds either way.
    for url in [&document.pdf_url, &document.docx_url] {
        if let Some(key) = blob_key_from_url(url) {
            if let Err(e) = data.storage.delete_file(key).await {
                error!("Failed to delete document blob '{}': {}", key, e);
            }
        }
    }

    match data.repo.delete_document(&document_id).await {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => {
            error!("Failed to delete document {}: {}", document_id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to delete document"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Service",
    post,
    path = "/documents/{id}/review",
    params(("id" = Uuid, Path, description = "Financial document ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = DocumentRecord),
        (status = 400, description = "Invalid status or non-financial document", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn review_document(
    id: Path<Uuid>,
    req: Json<ReviewRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let document_id = id.into_inner();
    info!(
        "Executing review_document handler for {} -> {}",
        document_id, req.status
    );

    let Some(status) = ApprovalStatus::parse(&req.status) else {
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&format!(
            "'{}' is not a valid review status",
            req.status
        )));
    };

    // Role checks happen in the presentation layer; here the caller is
    // trusted.
    match data.repo.get_document(&document_id).await {
        Ok(Some(document)) => {
            if let DocumentKind::Standard = document.kind {
                return HttpResponse::BadRequest().json(ErrorResponse::bad_request(
                    "Only financial documents can be reviewed",
                ));
            }
        }
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
                "Document with ID {} not found",
                document_id
            )));
        }
        Err(e) => {
            error!("Failed to fetch document {}: {}", document_id, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to retrieve document"));
        }
    }

    match data
        .repo
        .review_document(&document_id, status, &req.reviewer, Utc::now())
        .await
    {
        Ok(Some(document)) => HttpResponse::Ok().json(document),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
            "Document with ID {} not found",
            document_id
        ))),
        Err(e) => {
            error!("Failed to review document {}: {}", document_id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to record review"))
        }
    }
}

/// Redirects to the public blob-store URL for a stored artifact.
pub async fn serve_document(req: actix_web::HttpRequest, data: web::Data<AppState>) -> impl Responder {
    let key: String = req.match_info().query("key").into();
    debug!("Serving document blob '{}'", key);

    if key.is_empty() {
        return HttpResponse::NotFound()
            .json(ErrorResponse::not_found("No document key supplied"));
    }

    let url = data.storage.get_asset_url(&key);
    HttpResponse::TemporaryRedirect()
        .append_header(("Location", url))
        .finish()
}
