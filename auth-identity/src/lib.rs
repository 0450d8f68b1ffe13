//! Identity management for the EHR Engine
//!
//! This crate owns everything about *who* is calling:
//! - Human-readable business identifiers and their uniqueness protocol
//! - Patient and doctor records with salted bcrypt password hashes
//! - Registration, login and profile maintenance
//! - Stateless HS256 bearer tokens
//!
//! A principal's role is never stored on its record. It is the variant of
//! [`Principal`], i.e. which collection the record was loaded from.
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_identity::{IdentityConfig, IdentityService, InMemoryPrincipalRepository, NewPatient, Role, TokenService};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), auth_identity::IdentityError> {
//! let config = IdentityConfig::default();
//! let service = IdentityService::new(Arc::new(InMemoryPrincipalRepository::new()), config.clone());
//! let tokens = TokenService::from_config(&config);
//!
//! let patient = service
//!     .register_patient(NewPatient {
//!         name: "Asha".into(),
//!         mobile_number: "9999999999".into(),
//!         password: "secret1".into(),
//!         age: 30,
//!         blood_group: "O+".into(),
//!         height: 160.0,
//!         weight: 55.0,
//!         gender: None,
//!         address: None,
//!     })
//!     .await?;
//!
//! let principal = service.authenticate(Role::Patient, "9999999999", "secret1").await?;
//! let token = tokens.issue(principal.id(), principal.role())?;
//! # let _ = (patient, token);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod password;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod tokens;

pub use config::*;
pub use error::{describe_validation, IdentityError, StoreError};
pub use ids::{
    generate_candidate, AllocationError, Clock, EntityKind, FixedClock, IdentifierAllocator,
    IdentifierLookup, RandomSource, SequenceRandom, SystemClock, ThreadRandom,
};
pub use models::*;
pub use password::PasswordHasher;
pub use postgres::PgPrincipalRepository;
pub use repository::*;
pub use service::*;
pub use tokens::*;
