//! Hauler Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `UploadRecord`, `UploadStatus`, `ProgressEntry`
//! - **Newtypes** - `FileId`, `UploadHandle`, `TargetPath`
//! - **Port definitions** - Traits for adapters: `IUploadServer`, `IFileSource`, `IProgressObserver`
//! - **Configuration** - Typed config with documented defaults
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! The engine crate orchestrates domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
