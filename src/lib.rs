//! Service layer of the Otocap admin dashboard.
//!
//! Resource services over a remote data [`gateway`], plus the list and form
//! [`controllers`] every admin page is built from.

pub mod app_system;
pub mod config;
pub mod controllers;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod images;
pub mod resource;
pub mod session;

#[cfg(test)]
mod mock_framework;

pub use error::{ServiceError, ServiceResult};
