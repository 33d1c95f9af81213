//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, account updates and password reset
//! - `email` - Transactional email (password reset links)
//! - `stores` - Slug assignment, ownership checks, listings and hearts
//! - `uploads` - Store photo validation, resizing and storage

pub mod auth;
pub mod email;
pub mod stores;
pub mod uploads;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, EmailService};
pub use stores::{StoreError, StoreService};
pub use uploads::{PhotoUpload, UploadError};
