// src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// --- ENUMS ---

// Maps the CREATE TYPE document_type in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "document_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    Aadhar,
    Pan,
    Passport,
    Licence,
}

impl DocumentType {
    // Case-insensitive parse of a multipart text field.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "AADHAR" => Some(Self::Aadhar),
            "PAN" => Some(Self::Pan),
            "PASSPORT" => Some(Self::Passport),
            "LICENCE" => Some(Self::Licence),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aadhar => "AADHAR",
            Self::Pan => "PAN",
            Self::Passport => "PASSPORT",
            Self::Licence => "LICENCE",
        }
    }
}

// --- ROWS ---

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub customer_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub card_number: String,
    pub file_name: String,
    // Pointer into the file store; the bytes live outside the database.
    pub file_path: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// The Customer + Address + Document consistency unit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAggregate {
    #[serde(flatten)]
    pub customer: Customer,
    pub address: Option<Address>,
    pub documents: Vec<Document>,
}

// --- PAYLOADS ---

// Text fields of the multipart create request (the file travels separately).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[validate(length(min = 2, max = 100, message = "Customer name must be between 2 and 100 characters."))]
    pub name: String,
    #[validate(email(message = "A valid customer e-mail is required."))]
    pub email: String,
    #[validate(length(min = 10, max = 15, message = "Customer number must be between 10 and 15 characters."))]
    pub number: String,

    #[validate(length(min = 1, message = "Street is required."))]
    pub street: String,
    #[validate(length(min = 1, message = "City is required."))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required."))]
    pub state: String,
    #[validate(length(min = 1, message = "Pin code is required."))]
    pub pin_code: String,
    #[validate(length(min = 1, message = "Country is required."))]
    pub country: String,

    #[validate(length(min = 1, message = "Document type is required."))]
    pub document_type: String,
    #[validate(length(min = 1, message = "Card number is required."))]
    pub card_number: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerPayload {
    #[validate(length(min = 2, max = 100, message = "Customer name must be between 2 and 100 characters."))]
    pub name: Option<String>,
    #[validate(email(message = "A valid customer e-mail is required."))]
    pub email: Option<String>,
    #[validate(length(min = 10, max = 15, message = "Customer number must be between 10 and 15 characters."))]
    pub number: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pin_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListCustomersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_count: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct CustomerListResponse {
    pub customers: Vec<CustomerAggregate>,
    pub pagination: Pagination,
}
