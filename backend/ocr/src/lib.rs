//! Client for the cloud document-recognition workflow.
//!
//! A photographed vehicle registration certificate is submitted to a remote
//! workflow (vision model + parsing agent) as base64 text. The workflow runs
//! asynchronously: one trigger call returns an execution id, and the
//! execution is polled on a fixed cadence until it reports a terminal status
//! or the deadline elapses. The agent's free-form output is normalized into
//! the fixed [`DocumentFields`] set the booking form understands.

pub mod client;
pub mod extract;
pub mod fields;

mod error;

pub use client::{WorkflowConfig, WorkflowOcrClient};
pub use error::OcrError;
pub use fields::DocumentFields;
