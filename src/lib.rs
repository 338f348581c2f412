//! Resumable background generation engine.
//!
//! Two pieces share a durable key-value store:
//! - [`tasks::TaskRegistry`] keeps a capped history of background-operation
//!   records and reclassifies live ones as interrupted after a restart.
//! - [`generation::GenerationOrchestrator`] drives one AI generation job step
//!   by step against a [`service::GenerationService`], with backpressure,
//!   pause/resume/cancel and a persisted snapshot that is never resumed
//!   without being asked to.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod service;
pub mod store;
pub mod tasks;
pub mod timing;
pub mod ui;

pub use error::EngineError;
