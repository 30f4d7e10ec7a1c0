// src/db/customer_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customer::{Address, Customer, Document, DocumentType},
};

// Repository for the customer aggregate tables (customers, addresses,
// documents). All methods take an executor so the CustomerService decides
// what runs inside a transaction.
#[derive(Clone)]
pub struct CustomerRepository;

impl CustomerRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  CUSTOMERS
    // =========================================================================

    /// Ownership-scoped lookup: a customer belonging to another user is
    /// simply "not found".
    pub async fn find_customer<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = $1 AND user_id = $2",
        )
        .bind(customer_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(customer)
    }

    /// Duplicate-email check under one owner; `exclude` skips the customer
    /// being updated.
    pub async fn find_by_email_for_user<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        email: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers
             WHERE user_id = $1 AND email = $2 AND ($3::uuid IS NULL OR id <> $3)",
        )
        .bind(user_id)
        .bind(email)
        .bind(exclude)
        .fetch_optional(executor)
        .await?;
        Ok(customer)
    }

    pub async fn insert_customer<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        name: &str,
        email: &str,
        number: &str,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Customer>(
            "INSERT INTO customers (user_id, name, email, number)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .bind(email)
        .bind(number)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Unique (user_id, email) backs the pre-check against races
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateCustomer;
                }
            }
            e.into()
        })
    }

    pub async fn update_customer<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        number: Option<&str>,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            "UPDATE customers
             SET name = COALESCE($1, name),
                 email = COALESCE($2, email),
                 number = COALESCE($3, number),
                 updated_at = now()
             WHERE id = $4
             RETURNING *",
        )
        .bind(name)
        .bind(email)
        .bind(number)
        .bind(customer_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateCustomer;
                }
            }
            e.into()
        })?;
        Ok(customer)
    }

    /// Cascade rules remove the address and document rows with the customer.
    pub async fn delete_customer<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_customers<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pattern = search.map(|s| format!("%{}%", s));
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT c.* FROM customers c
             LEFT JOIN addresses a ON a.customer_id = c.id
             WHERE c.user_id = $1
               AND ($2::text IS NULL
                    OR c.name ILIKE $2 OR c.email ILIKE $2 OR c.number ILIKE $2
                    OR a.city ILIKE $2 OR a.state ILIKE $2)
             ORDER BY c.created_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(user_id)
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;
        Ok(customers)
    }

    pub async fn count_customers<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        search: Option<&str>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pattern = search.map(|s| format!("%{}%", s));
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT c.id) FROM customers c
             LEFT JOIN addresses a ON a.customer_id = c.id
             WHERE c.user_id = $1
               AND ($2::text IS NULL
                    OR c.name ILIKE $2 OR c.email ILIKE $2 OR c.number ILIKE $2
                    OR a.city ILIKE $2 OR a.state ILIKE $2)",
        )
        .bind(user_id)
        .bind(pattern)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    // =========================================================================
    //  ADDRESSES
    // =========================================================================

    pub async fn insert_address<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        street: &str,
        city: &str,
        state: &str,
        pin_code: &str,
        country: &str,
    ) -> Result<Address, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = sqlx::query_as::<_, Address>(
            "INSERT INTO addresses (customer_id, street, city, state, pin_code, country)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(customer_id)
        .bind(street)
        .bind(city)
        .bind(state)
        .bind(pin_code)
        .bind(country)
        .fetch_one(executor)
        .await?;
        Ok(address)
    }

    pub async fn find_address<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Option<Address>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address =
            sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_optional(executor)
                .await?;
        Ok(address)
    }

    pub async fn update_address<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        street: Option<&str>,
        city: Option<&str>,
        state: Option<&str>,
        pin_code: Option<&str>,
        country: Option<&str>,
    ) -> Result<Address, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let address = sqlx::query_as::<_, Address>(
            "UPDATE addresses
             SET street = COALESCE($1, street),
                 city = COALESCE($2, city),
                 state = COALESCE($3, state),
                 pin_code = COALESCE($4, pin_code),
                 country = COALESCE($5, country),
                 updated_at = now()
             WHERE customer_id = $6
             RETURNING *",
        )
        .bind(street)
        .bind(city)
        .bind(state)
        .bind(pin_code)
        .bind(country)
        .bind(customer_id)
        .fetch_one(executor)
        .await?;
        Ok(address)
    }

    // =========================================================================
    //  DOCUMENTS
    // =========================================================================

    pub async fn insert_document<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        doc_type: DocumentType,
        card_number: &str,
        file_name: &str,
        file_path: &str,
        file_size: i64,
    ) -> Result<Document, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, Document>(
            "INSERT INTO documents (customer_id, type, card_number, file_name, file_path, file_size)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING *",
        )
        .bind(customer_id)
        .bind(doc_type)
        .bind(card_number)
        .bind(file_name)
        .bind(file_path)
        .bind(file_size)
        .fetch_one(executor)
        .await?;
        Ok(document)
    }

    // Storage allows more than one document per customer; the service treats
    // the first (oldest) as the active one.
    pub async fn list_documents<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Vec<Document>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE customer_id = $1 ORDER BY created_at ASC",
        )
        .bind(customer_id)
        .fetch_all(executor)
        .await?;
        Ok(documents)
    }

    /// Lookup that verifies the whole ownership chain (document -> customer
    /// -> user) in one query.
    pub async fn find_document_owned<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
        customer_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Document>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, Document>(
            "SELECT d.* FROM documents d
             JOIN customers c ON c.id = d.customer_id
             WHERE d.id = $1 AND d.customer_id = $2 AND c.user_id = $3",
        )
        .bind(document_id)
        .bind(customer_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(document)
    }

    pub async fn update_document<'e, E>(
        &self,
        executor: E,
        document_id: Uuid,
        doc_type: Option<DocumentType>,
        card_number: Option<&str>,
        file_name: Option<&str>,
        file_path: Option<&str>,
        file_size: Option<i64>,
    ) -> Result<Document, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = sqlx::query_as::<_, Document>(
            "UPDATE documents
             SET type = COALESCE($1, type),
                 card_number = COALESCE($2, card_number),
                 file_name = COALESCE($3, file_name),
                 file_path = COALESCE($4, file_path),
                 file_size = COALESCE($5, file_size),
                 updated_at = now()
             WHERE id = $6
             RETURNING *",
        )
        .bind(doc_type)
        .bind(card_number)
        .bind(file_name)
        .bind(file_path)
        .bind(file_size)
        .bind(document_id)
        .fetch_one(executor)
        .await?;
        Ok(document)
    }
}

impl Default for CustomerRepository {
    fn default() -> Self {
        Self::new()
    }
}
