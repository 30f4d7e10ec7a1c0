pub mod user_repo;
pub use user_repo::UserRepository;
pub mod session_repo;
pub use session_repo::SessionRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
