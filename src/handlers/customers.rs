// src/handlers/customers.rs

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::customer::{CreateCustomerPayload, ListCustomersQuery, UpdateCustomerPayload},
    services::{
        customer_service::discard_on_err,
        file_service::{validate_upload, StoredFile, MAX_UPLOAD_BYTES},
    },
};

// Text fields + the (already persisted) upload of a multipart form.
struct DocumentForm {
    fields: HashMap<String, String>,
    upload: Option<StoredFile>,
}

// Walks the multipart stream. The file is validated (type, size) and written
// to the file store as soon as it arrives; from that point on the caller owns
// the cleanup obligation.
async fn read_document_form(
    app_state: &AppState,
    mut multipart: Multipart,
) -> Result<DocumentForm, AppError> {
    let mut fields = HashMap::new();
    let mut upload: Option<StoredFile> = None;

    let result = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidUpload(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "document" {
                if upload.is_some() {
                    return Err(AppError::InvalidUpload(
                        "Too many files. Only one file is allowed.".to_string(),
                    ));
                }
                let file_name = field.file_name().unwrap_or("document").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                validate_upload(&file_name, &content_type)?;

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidUpload(e.to_string()))?;
                if data.len() > MAX_UPLOAD_BYTES {
                    return Err(AppError::InvalidUpload(
                        "File too large. Maximum size is 5MB.".to_string(),
                    ));
                }

                upload = Some(app_state.file_store.save(&data, &file_name).await?);
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidUpload(e.to_string()))?;
                fields.insert(name, value);
            }
        }
        Ok(())
    }
    .await;

    if let Err(e) = result {
        // A partially-read form must not leave an orphan behind
        if let Some(stored) = &upload {
            app_state.file_store.delete(&stored.file_path).await;
        }
        return Err(e);
    }

    Ok(DocumentForm { fields, upload })
}

// POST /api/customers
pub async fn create_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_document_form(&app_state, multipart).await?;

    let upload = form.upload.ok_or_else(|| {
        AppError::InvalidUpload("Document file is required.".to_string())
    })?;

    // Field parsing happens after the file is on disk, so its failures also
    // run the compensation path.
    let parsed: Result<CreateCustomerPayload, AppError> =
        serde_json::from_value(json!(form.fields))
            .map_err(|e| AppError::InvalidUpload(format!("Invalid form data: {}", e)))
            .and_then(|payload: CreateCustomerPayload| {
                payload.validate()?;
                Ok(payload)
            });
    let payload = discard_on_err(&app_state.file_store, &upload.file_path, parsed).await?;

    let aggregate = app_state
        .customer_service
        .create_customer(user.id, &payload, upload)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "customer": aggregate }))))
}

// GET /api/customers
pub async fn list_customers(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListCustomersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let list = app_state.customer_service.list_customers(user.id, &query).await?;
    Ok(Json(list))
}

// GET /api/customers/{id}
pub async fn get_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let aggregate = app_state.customer_service.get_customer(user.id, id).await?;
    Ok(Json(json!({ "customer": aggregate })))
}

// PUT /api/customers/{id}
pub async fn update_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let aggregate = app_state
        .customer_service
        .update_customer(user.id, id, &payload)
        .await?;
    Ok(Json(json!({ "customer": aggregate })))
}

// DELETE /api/customers/{id}
pub async fn delete_customer(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.customer_service.delete_customer(user.id, id).await?;
    Ok(Json(json!({ "message": "Customer deleted successfully." })))
}

// PUT /api/customers/{id}/document
pub async fn update_document(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path(customer_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_document_form(&app_state, multipart).await?;

    let document = app_state
        .customer_service
        .update_document(
            user.id,
            customer_id,
            form.fields.get("documentType").map(String::as_str),
            form.fields.get("cardNumber").map(String::as_str),
            form.upload,
        )
        .await?;

    Ok(Json(json!({ "document": document })))
}

// GET /api/customers/{customer_id}/documents/{document_id}/file
pub async fn get_document_file(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    Path((customer_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    let (document, bytes) = app_state
        .customer_service
        .get_document_file(user.id, customer_id, document_id)
        .await?;

    let content_type = match document
        .file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    };

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", document.file_name),
        ),
    ];

    Ok((headers, bytes).into_response())
}
