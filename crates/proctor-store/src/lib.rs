//! proctor-store: Exam stores and report sinks.
//!
//! Implements the `ExamStore` and `ReportSink` traits over the filesystem
//! and over the exam portal's HTTP API, plus in-memory mocks for tests.

pub mod config;
pub mod fs;
pub mod http;
pub mod mock;

pub use config::{create_sink, create_store, load_config, ProctorConfig, SinkConfig, StoreConfig};
pub use proctor_core::error::StoreError;
