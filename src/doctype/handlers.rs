use crate::db::AppState;
use crate::doctype::models::{CreateDocumentTypeRequest, DocumentType};
use crate::document::generate::blob_key_from_url;
use crate::ErrorResponse;
use actix_web::{
    web::{self, Json, Path},
    HttpResponse, Responder,
};
use log::{error, info, warn};

#[utoipa::path(
    context_path = "/api",
    tag = "Document Type Service",
    get,
    path = "/document-types",
    responses(
        (status = 200, description = "All configured document types", body = Vec<DocumentType>),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_document_types(data: web::Data<AppState>) -> impl Responder {
    match data.repo.list_document_types().await {
        Ok(types) => HttpResponse::Ok().json(types),
        Err(e) => {
            error!("Failed to list document types: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to retrieve document types"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Type Service",
    post,
    path = "/document-types",
    request_body = CreateDocumentTypeRequest,
    responses(
        (status = 201, description = "Document type created", body = DocumentType),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Name already registered", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn create_document_type(
    req: Json<CreateDocumentTypeRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    let name = req.name.trim().to_string();
    info!("Executing create_document_type handler for '{}'", name);

    if name.is_empty() {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("Document type name cannot be empty"));
    }

    match data.repo.get_document_type(&name).await {
        Ok(Some(_)) => {
            return HttpResponse::Conflict().json(ErrorResponse::new(
                "Conflict",
                &format!("Document type '{}' already exists", name),
            ));
        }
        Ok(None) => {}
        Err(e) => {
            error!("Failed to check document type '{}': {}", name, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to check document type"));
        }
    }

    let doc_type = DocumentType::new(name, req.is_financial);
    match data.repo.insert_document_type(&doc_type).await {
        Ok(()) => HttpResponse::Created().json(doc_type),
        Err(e) => {
            error!("Failed to create document type: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to create document type"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Document Type Service",
    delete,
    path = "/document-types/{name}",
    params(("name" = String, Path, description = "Document type name")),
    responses(
        (status = 204, description = "Document type and all tagged templates/documents deleted"),
        (status = 404, description = "Document type not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn delete_document_type(name: Path<String>, data: web::Data<AppState>) -> impl Responder {
    let name = name.into_inner();
    info!("Executing delete_document_type handler for '{}'", name);

    match data.repo.get_document_type(&name).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
                "Document type '{}' not found",
                name
            )));
        }
        Err(e) => {
            error!("Failed to fetch document type '{}': {}", name, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to retrieve document type"));
        }
    }

    // Compensating multi-step cascade, not a database-level one: templates
    // and documents are correlated with the type by name only. Each step is
    // best-effort so a single stuck blob cannot wedge the whole deletion.
    match data.repo.list_templates_by_category(&name).await {
        Ok(templates) => {
            for template in templates {
                match data.templates.delete(&template.id).await {
                    Ok(_) => {}
                    Err(e) => warn!(
                        "Failed to delete template {} while removing type '{}': {}",
                        template.id, name, e
                    ),
                }
            }
        }
        Err(e) => {
            error!("Failed to list templates for type '{}': {}", name, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to delete tagged templates"));
        }
    }

    match data.repo.list_documents_by_type(&name).await {
        Ok(documents) => {
            for document in documents {
                for url in [&document.pdf_url, &document.docx_url] {
                    if let Some(key) = blob_key_from_url(url) {
                        if let Err(e) = data.storage.delete_file(key).await {
                            warn!("Failed to delete document blob '{}': {}", key, e);
                        }
                    }
                }
                if let Err(e) = data.repo.delete_document(&document.id).await {
                    warn!(
                        "Failed to delete document {} while removing type '{}': {}",
                        document.id, name, e
                    );
                }
            }
        }
        Err(e) => {
            error!("Failed to list documents for type '{}': {}", name, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to delete tagged documents"));
        }
    }

    match data.repo.delete_document_type(&name).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
            "Document type '{}' not found",
            name
        ))),
        Err(e) => {
            error!("Failed to delete document type '{}': {}", name, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to delete document type"))
        }
    }
}
