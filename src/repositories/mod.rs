//! Data access helpers that must run inside a caller-owned transaction.

pub mod batch_repository;

pub use batch_repository::BatchRepository;
