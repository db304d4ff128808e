use crate::db::AppState;
use crate::error::DocumentError;
use crate::template::models::Template;
use crate::ErrorResponse;
use actix_multipart::Multipart;
use actix_web::{
    web::{self, Path},
    HttpResponse, Responder,
};
use futures::TryStreamExt;
use log::{debug, error, info};
use sanitize_filename::sanitize;
use std::path::Path as StdPath;
use uuid::Uuid;

/// Fields carried by a template upload form.
#[derive(Default)]
struct TemplateUploadForm {
    blob_key: Option<String>,
    name: Option<String>,
    category: Option<String>,
    placeholders: Option<Vec<String>>,
}

async fn read_text_field(field: &mut actix_multipart::Field) -> Result<String, String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(|e| e.to_string())? {
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

/// Parses the multipart payload, streaming the file part into object storage
/// under a unique `templates/` key.
async fn parse_template_upload(
    mut payload: Multipart,
    state: &web::Data<AppState>,
) -> Result<TemplateUploadForm, String> {
    let mut form = TemplateUploadForm::default();

    while let Some(mut field) = payload.try_next().await.map_err(|e| e.to_string())? {
        let content_disposition = field
            .content_disposition()
            .ok_or("Content-Disposition not set")?;
        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| "No field name".to_string())?
            .to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = content_disposition
                    .get_filename()
                    .ok_or_else(|| "No filename".to_string())?;
                let sanitized_filename = sanitize(file_name);

                let ext = StdPath::new(&sanitized_filename)
                    .extension()
                    .and_then(std::ffi::OsStr::to_str)
                    .unwrap_or("docx");

                let blob_key = format!(
                    "templates/{}_{}.{}",
                    Uuid::new_v4(),
                    sanitized_filename.replace('.', "_"),
                    ext
                );

                let mut file_data = Vec::new();
                while let Some(chunk) = field.try_next().await.map_err(|e| e.to_string())? {
                    file_data.extend_from_slice(&chunk);
                }

                state.storage.upload_file(&blob_key, &file_data).await?;
                form.blob_key = Some(blob_key);
            }
            "name" => {
                form.name = Some(read_text_field(&mut field).await?);
            }
            "category" => {
                form.category = Some(read_text_field(&mut field).await?);
            }
            "placeholders" => {
                let value = read_text_field(&mut field).await?;
                form.placeholders = Some(
                    value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                );
            }
            _ => continue,
        }
    }

    Ok(form)
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    get,
    path = "/templates",
    responses(
        (status = 200, description = "All templates, most recently updated first", body = Vec<Template>),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_templates(data: web::Data<AppState>) -> impl Responder {
    info!("Executing list_templates handler");
    match data.templates.list().await {
        Ok(templates) => HttpResponse::Ok().json(templates),
        Err(e) => {
            error!("Failed to list templates: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to retrieve templates"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    post,
    path = "/templates",
    request_body(content = String, content_type = "multipart/form-data",
        description = "Fields: file (binary), name, category, placeholders (comma separated, optional)"),
    responses(
        (status = 201, description = "Template created", body = Template),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn create_template(payload: Multipart, data: web::Data<AppState>) -> impl Responder {
    info!("Executing create_template handler");

    let form = match parse_template_upload(payload, &data).await {
        Ok(form) => form,
        Err(e) => {
            error!("Failed to process template upload: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e));
        }
    };

    let (name, category) = match (form.name, form.category) {
        (Some(name), Some(category)) if !name.is_empty() && !category.is_empty() => {
            (name, category)
        }
        _ => {
            return HttpResponse::BadRequest()
                .json(ErrorResponse::bad_request("name and category are required"));
        }
    };

    if form.blob_key.is_none() {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("No template file was uploaded"));
    }

    match data
        .templates
        .create_or_update(None, name, category, form.blob_key, form.placeholders)
        .await
    {
        Ok(template) => HttpResponse::Created().json(template),
        Err(e) => {
            error!("Failed to create template: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to create template"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    get,
    path = "/templates/{id}",
    params(("id" = Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template found", body = Template),
        (status = 404, description = "Template not found", body = ErrorResponse)
    )
)]
pub async fn get_template(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let template_id = id.into_inner();
    debug!("Fetching template {}", template_id);
    match data.templates.get(&template_id).await {
        Ok(Some(template)) => HttpResponse::Ok().json(template),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
            "Template with ID {} not found",
            template_id
        ))),
        Err(e) => {
            error!("Failed to get template {}: {}", template_id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to retrieve template"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    put,
    path = "/templates/{id}",
    params(("id" = Uuid, Path, description = "Template ID")),
    request_body(content = String, content_type = "multipart/form-data",
        description = "Fields: file (binary, optional), name (optional), placeholders (optional). Category is immutable."),
    responses(
        (status = 200, description = "Template updated", body = Template),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Template not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn update_template(
    id: Path<Uuid>,
    payload: Multipart,
    data: web::Data<AppState>,
) -> impl Responder {
    let template_id = id.into_inner();
    info!("Executing update_template handler for {}", template_id);

    let existing = match data.templates.get(&template_id).await {
        Ok(Some(t)) => t,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
                "Template with ID {} not found",
                template_id
            )));
        }
        Err(e) => {
            error!("Failed to fetch template {}: {}", template_id, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to retrieve template"));
        }
    };

    let form = match parse_template_upload(payload, &data).await {
        Ok(form) => form,
        Err(e) => {
            error!("Failed to process template upload: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e));
        }
    };

    // Category is fixed at creation time.
    if let Some(category) = &form.category {
        if category != &existing.category {
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request(
                "Template category cannot be changed",
            ));
        }
    }

    let name = form.name.unwrap_or_else(|| existing.name.clone());
    match data
        .templates
        .create_or_update(
            Some(template_id),
            name,
            existing.category.clone(),
            form.blob_key,
            form.placeholders,
        )
        .await
    {
        Ok(template) => HttpResponse::Ok().json(template),
        Err(DocumentError::NotFound(msg)) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found(&msg))
        }
        Err(e) => {
            error!("Failed to update template {}: {}", template_id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to update template"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    delete,
    path = "/templates/{id}",
    params(("id" = Uuid, Path, description = "Template ID")),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Template not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn delete_template(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let template_id = id.into_inner();
    info!("Executing delete_template handler for {}", template_id);
    match data.templates.delete(&template_id).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => HttpResponse::NotFound().json(ErrorResponse::not_found(&format!(
            "Template with ID {} not found",
            template_id
        ))),
        Err(e) => {
            error!("Failed to delete template {}: {}", template_id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to delete template"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    tag = "Template Service",
    post,
    path = "/templates/placeholders",
    request_body(content = String, content_type = "multipart/form-data",
        description = "Template binary to scan for substitution tokens"),
    responses(
        (status = 200, description = "Tokens discovered by the extractor, passed through verbatim"),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Extractor failure", body = ErrorResponse)
    )
)]
pub async fn extract_placeholders(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> impl Responder {
    info!("Executing extract_placeholders handler");

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Ok(Some(mut field)) = payload.try_next().await {
        let Some(content_disposition) = field.content_disposition() else {
            continue;
        };
        if content_disposition.get_name() != Some("file") {
            continue;
        }
        let filename = content_disposition
            .get_filename()
            .unwrap_or("template.docx")
            .to_string();

        let mut bytes = Vec::new();
        loop {
            match field.try_next().await {
                Ok(Some(chunk)) => bytes.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read template upload: {}", e);
                    return HttpResponse::BadRequest()
                        .json(ErrorResponse::bad_request("Failed to read uploaded file"));
                }
            }
        }
        file = Some((filename, bytes));
    }

    let Some((filename, bytes)) = file else {
        return HttpResponse::BadRequest()
            .json(ErrorResponse::bad_request("No template file was uploaded"));
    };

    match data.extractor.extract(&filename, bytes).await {
        Ok(tokens) => HttpResponse::Ok().json(tokens),
        Err(e) => {
            error!("Placeholder extraction failed: {}", e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&e.to_string()))
        }
    }
}
