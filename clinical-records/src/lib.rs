//! Clinical records for the EHR Engine
//!
//! Visits, scan report metadata and patient-to-doctor queries. Each record
//! gets a `VISIT-`, `REPORT-` or `QUERY-` business id from the shared
//! identifier allocator in `auth-identity`, and refers to patients and
//! doctors by their durable ids.
//!
//! Scan files themselves are stored elsewhere. This crate only records their
//! path and whether the declared media type was an image or a PDF.

pub mod error;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use error::RecordError;
pub use models::*;
pub use postgres::PgRecordRepository;
pub use repository::{InMemoryRecordRepository, RecordRepository};
pub use service::RecordService;
