// src/services/customer_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CustomerRepository,
    models::customer::{
        CreateCustomerPayload, Customer, CustomerAggregate, CustomerListResponse, Document,
        DocumentType, ListCustomersQuery, Pagination, UpdateCustomerPayload,
    },
    services::file_service::{format_card_number, validate_card_number, FileStore, StoredFile},
};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

/// Compensation half of the cross-store saga: the uploaded file is already on
/// disk when the database work starts, so any failure must remove it again.
/// Either both the file and the Document row survive, or neither does.
pub async fn discard_on_err<T>(
    files: &FileStore,
    stored_path: &str,
    outcome: Result<T, AppError>,
) -> Result<T, AppError> {
    if outcome.is_err() {
        files.delete(stored_path).await;
    }
    outcome
}

/// Merged-view re-validation for a partial document update: the (type,
/// number) pair that would result from the update is checked as a whole, so
/// changing one side can never leave an inconsistent pairing. Returns the
/// values to write (`None` = keep the stored one).
pub fn resolve_document_update(
    existing: &Document,
    new_type: Option<&str>,
    new_number: Option<&str>,
) -> Result<(Option<DocumentType>, Option<String>), AppError> {
    if new_type.is_none() && new_number.is_none() {
        return Ok((None, None));
    }

    let doc_type = match new_type {
        Some(raw) => DocumentType::parse(raw)
            .ok_or_else(|| AppError::InvalidDocument("Invalid document type.".to_string()))?,
        None => existing.doc_type,
    };

    let number = new_number.unwrap_or(&existing.card_number);
    if !validate_card_number(doc_type, number) {
        return Err(AppError::InvalidDocument(format!(
            "Invalid {} card number format.",
            doc_type.as_str()
        )));
    }

    // Re-formatted even when only the type changed, so the stored grouping
    // always matches the stored type.
    let formatted = format_card_number(doc_type, number);
    Ok((new_type.map(|_| doc_type), Some(formatted)))
}

/// Creates, updates, and deletes the customer + address + document aggregate
/// as one consistent unit, compensating file-store writes when the database
/// side fails (and vice versa).
#[derive(Clone)]
pub struct CustomerService {
    repo: CustomerRepository,
    files: FileStore,
    pool: PgPool,
}

impl CustomerService {
    pub fn new(repo: CustomerRepository, files: FileStore, pool: PgPool) -> Self {
        Self { repo, files, pool }
    }

    // =========================================================================
    //  CREATE
    // =========================================================================

    /// The upload layer has already written `upload` to the file store; from
    /// here on every failure path deletes it before surfacing the error.
    pub async fn create_customer(
        &self,
        owner: Uuid,
        payload: &CreateCustomerPayload,
        upload: StoredFile,
    ) -> Result<CustomerAggregate, AppError> {
        let outcome = self.try_create(owner, payload, &upload).await;
        discard_on_err(&self.files, &upload.file_path, outcome).await
    }

    async fn try_create(
        &self,
        owner: Uuid,
        payload: &CreateCustomerPayload,
        upload: &StoredFile,
    ) -> Result<CustomerAggregate, AppError> {
        // 1. Document policy checks come before anything touches the database
        let doc_type = DocumentType::parse(&payload.document_type)
            .ok_or_else(|| AppError::InvalidDocument("Invalid document type.".to_string()))?;
        if !validate_card_number(doc_type, &payload.card_number) {
            return Err(AppError::InvalidDocument(format!(
                "Invalid {} card number format.",
                doc_type.as_str()
            )));
        }

        // 2. Duplicate e-mail under the same owner
        if self
            .repo
            .find_by_email_for_user(&self.pool, owner, &payload.email, None)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateCustomer);
        }

        let card_number = format_card_number(doc_type, &payload.card_number);

        // 3. Customer + address + document as one atomic transaction
        let mut tx = self.pool.begin().await?;

        let customer = self
            .repo
            .insert_customer(&mut *tx, owner, &payload.name, &payload.email, &payload.number)
            .await?;

        let address = self
            .repo
            .insert_address(
                &mut *tx,
                customer.id,
                &payload.street,
                &payload.city,
                &payload.state,
                &payload.pin_code,
                &payload.country,
            )
            .await?;

        let document = self
            .repo
            .insert_document(
                &mut *tx,
                customer.id,
                doc_type,
                &card_number,
                &upload.file_name,
                &upload.file_path,
                upload.file_size,
            )
            .await?;

        tx.commit().await?;

        Ok(CustomerAggregate {
            customer,
            address: Some(address),
            documents: vec![document],
        })
    }

    // =========================================================================
    //  READ
    // =========================================================================

    pub async fn get_customer(
        &self,
        owner: Uuid,
        customer_id: Uuid,
    ) -> Result<CustomerAggregate, AppError> {
        let customer = self
            .repo
            .find_customer(&self.pool, customer_id, owner)
            .await?
            .ok_or(AppError::NotFound)?;
        self.load_aggregate(customer).await
    }

    async fn load_aggregate(&self, customer: Customer) -> Result<CustomerAggregate, AppError> {
        let address = self.repo.find_address(&self.pool, customer.id).await?;
        let documents = self.repo.list_documents(&self.pool, customer.id).await?;
        Ok(CustomerAggregate {
            customer,
            address,
            documents,
        })
    }

    pub async fn list_customers(
        &self,
        owner: Uuid,
        query: &ListCustomersQuery,
    ) -> Result<CustomerListResponse, AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * limit;
        let search = query.search.as_deref().filter(|s| !s.trim().is_empty());

        let customers = self
            .repo
            .list_customers(&self.pool, owner, search, limit, offset)
            .await?;
        let total_count = self.repo.count_customers(&self.pool, owner, search).await?;
        let total_pages = (total_count + limit - 1) / limit;

        let mut aggregates = Vec::with_capacity(customers.len());
        for customer in customers {
            aggregates.push(self.load_aggregate(customer).await?);
        }

        Ok(CustomerListResponse {
            customers: aggregates,
            pagination: Pagination {
                current_page: page,
                total_pages,
                total_count,
                has_next: page < total_pages,
                has_prev: page > 1,
            },
        })
    }

    // =========================================================================
    //  UPDATE
    // =========================================================================

    pub async fn update_customer(
        &self,
        owner: Uuid,
        customer_id: Uuid,
        payload: &UpdateCustomerPayload,
    ) -> Result<CustomerAggregate, AppError> {
        let existing = self
            .repo
            .find_customer(&self.pool, customer_id, owner)
            .await?
            .ok_or(AppError::NotFound)?;

        // Duplicate check only when the e-mail actually changes
        if let Some(email) = payload.email.as_deref() {
            if email != existing.email
                && self
                    .repo
                    .find_by_email_for_user(&self.pool, owner, email, Some(customer_id))
                    .await?
                    .is_some()
            {
                return Err(AppError::DuplicateCustomer);
            }
        }

        let mut tx = self.pool.begin().await?;

        let customer = self
            .repo
            .update_customer(
                &mut *tx,
                customer_id,
                payload.name.as_deref(),
                payload.email.as_deref(),
                payload.number.as_deref(),
            )
            .await?;

        let touches_address = payload.street.is_some()
            || payload.city.is_some()
            || payload.state.is_some()
            || payload.pin_code.is_some()
            || payload.country.is_some();
        if touches_address {
            self.repo
                .update_address(
                    &mut *tx,
                    customer_id,
                    payload.street.as_deref(),
                    payload.city.as_deref(),
                    payload.state.as_deref(),
                    payload.pin_code.as_deref(),
                    payload.country.as_deref(),
                )
                .await?;
        }

        tx.commit().await?;

        self.load_aggregate(customer).await
    }

    /// Replaces document fields and/or the file itself. A replacement file is
    /// discarded again if anything fails; the old file is deleted only after
    /// the database update committed, so a failed update never loses the only
    /// copy.
    pub async fn update_document(
        &self,
        owner: Uuid,
        customer_id: Uuid,
        new_type: Option<&str>,
        new_number: Option<&str>,
        upload: Option<StoredFile>,
    ) -> Result<Document, AppError> {
        let outcome = self
            .try_update_document(owner, customer_id, new_type, new_number, upload.as_ref())
            .await;
        let outcome = match upload.as_ref() {
            Some(stored) => discard_on_err(&self.files, &stored.file_path, outcome).await,
            None => outcome,
        };
        let (document, replaced_path) = outcome?;

        if let Some(old) = replaced_path {
            self.files.delete(&old).await;
        }
        Ok(document)
    }

    async fn try_update_document(
        &self,
        owner: Uuid,
        customer_id: Uuid,
        new_type: Option<&str>,
        new_number: Option<&str>,
        upload: Option<&StoredFile>,
    ) -> Result<(Document, Option<String>), AppError> {
        if new_type.is_none() && new_number.is_none() && upload.is_none() {
            return Err(AppError::InvalidDocument(
                "No document fields to update.".to_string(),
            ));
        }

        let customer = self
            .repo
            .find_customer(&self.pool, customer_id, owner)
            .await?
            .ok_or(AppError::NotFound)?;

        let documents = self.repo.list_documents(&self.pool, customer.id).await?;
        let existing = documents.first().ok_or(AppError::NotFound)?;

        let (doc_type, card_number) = resolve_document_update(existing, new_type, new_number)?;

        let document = self
            .repo
            .update_document(
                &self.pool,
                existing.id,
                doc_type,
                card_number.as_deref(),
                upload.map(|s| s.file_name.as_str()),
                upload.map(|s| s.file_path.as_str()),
                upload.map(|s| s.file_size),
            )
            .await?;

        let replaced_path = upload.map(|_| existing.file_path.clone());
        Ok((document, replaced_path))
    }

    // =========================================================================
    //  DELETE
    // =========================================================================

    /// Database first (cascade removes address and document rows), then the
    /// files. The database is the source of truth: a file that fails to
    /// delete afterwards is logged inside the store, never surfaced.
    pub async fn delete_customer(&self, owner: Uuid, customer_id: Uuid) -> Result<(), AppError> {
        let customer = self
            .repo
            .find_customer(&self.pool, customer_id, owner)
            .await?
            .ok_or(AppError::NotFound)?;

        let documents = self.repo.list_documents(&self.pool, customer.id).await?;

        self.repo.delete_customer(&self.pool, customer.id).await?;

        for document in &documents {
            self.files.delete(&document.file_path).await;
        }
        Ok(())
    }

    // =========================================================================
    //  FILES
    // =========================================================================

    pub async fn get_document_file(
        &self,
        owner: Uuid,
        customer_id: Uuid,
        document_id: Uuid,
    ) -> Result<(Document, Vec<u8>), AppError> {
        let document = self
            .repo
            .find_document_owned(&self.pool, document_id, customer_id, owner)
            .await?
            .ok_or(AppError::NotFound)?;

        let bytes = self.files.read(&document.file_path).await?;
        Ok((document, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn pan_document() -> Document {
        let now = Utc::now();
        Document {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            doc_type: DocumentType::Pan,
            card_number: "ABCDE1234F".into(),
            file_name: "pan.pdf".into(),
            file_path: "pan.pdf".into(),
            file_size: 128,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn number_only_update_validates_against_stored_type() {
        let existing = pan_document();
        // "123456789012" is a fine AADHAR but not a PAN; stored type rules
        let err = resolve_document_update(&existing, None, Some("123456789012"));
        assert!(matches!(err, Err(AppError::InvalidDocument(_))));

        let (doc_type, number) =
            resolve_document_update(&existing, None, Some("xyzab5678k")).unwrap();
        assert_eq!(doc_type, None);
        assert_eq!(number.as_deref(), Some("XYZAB5678K"));
    }

    #[test]
    fn type_only_update_revalidates_existing_number() {
        let existing = pan_document();
        // a PAN number is not a valid AADHAR, so the merged pair must fail
        assert!(matches!(
            resolve_document_update(&existing, Some("AADHAR"), None),
            Err(AppError::InvalidDocument(_))
        ));

        // PASSPORT accepts 6-9 alphanumerics, so the pairing stays consistent
        let (doc_type, number) =
            resolve_document_update(&existing, Some("PASSPORT"), None).unwrap();
        assert_eq!(doc_type, Some(DocumentType::Passport));
        assert_eq!(number.as_deref(), Some("ABCDE1234F"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(matches!(
            resolve_document_update(&pan_document(), Some("VOTER_ID"), Some("123")),
            Err(AppError::InvalidDocument(_))
        ));
    }

    #[test]
    fn full_update_reformats_for_the_new_type() {
        let (doc_type, number) =
            resolve_document_update(&pan_document(), Some("AADHAR"), Some("1234-5678-9012"))
                .unwrap();
        assert_eq!(doc_type, Some(DocumentType::Aadhar));
        assert_eq!(number.as_deref(), Some("1234 5678 9012"));
    }

    #[test]
    fn empty_update_keeps_everything() {
        let (doc_type, number) = resolve_document_update(&pan_document(), None, None).unwrap();
        assert_eq!(doc_type, None);
        assert_eq!(number, None);
    }

    #[tokio::test]
    async fn compensation_deletes_the_file_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(dir.path());
        let stored = files.save(b"payload", "doc.pdf").await.unwrap();

        let outcome: Result<(), AppError> = Err(AppError::DuplicateCustomer);
        let result = discard_on_err(&files, &stored.file_path, outcome).await;

        assert!(matches!(result, Err(AppError::DuplicateCustomer)));
        assert!(!files.exists(&stored.file_path).await);
    }

    #[tokio::test]
    async fn compensation_keeps_the_file_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(dir.path());
        let stored = files.save(b"payload", "doc.pdf").await.unwrap();

        let result = discard_on_err(&files, &stored.file_path, Ok(42)).await;

        assert_eq!(result.unwrap(), 42);
        assert!(files.exists(&stored.file_path).await);
    }
}
