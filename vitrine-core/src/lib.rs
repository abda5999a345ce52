//! Core types and services for the vitrine back office.
//!
//! This crate holds everything that does not depend on a particular storage
//! backend or web framework:
//!
//! - [`storage`]: the records the backends persist
//! - [`repositories`]: the traits a backend implements
//! - [`services`]: the login guard, the position sequencer, the calendar and
//!   the reminder scheduler
//! - [`config`]: tunables for the services and the connection pool
//!
//! Backends live in `vitrine-storage-sqlite` and `vitrine-storage-postgres`.
pub mod config;
pub mod error;
pub mod repositories;
pub mod services;
pub mod storage;
pub mod tenant;
pub mod time;

pub use config::{LockoutTier, LoginGuardConfig, PoolConfig, SchedulerConfig};
pub use error::{Error, ErrorKind};
pub use storage::{
    Blog, CalendarEvent, CalendarEventView, Item, LockoutStatus, LoginAttempt, Orderable,
};
pub use tenant::TenantId;
