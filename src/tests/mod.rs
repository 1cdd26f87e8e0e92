//! Consolidated test modules.
//!
//! End-to-end tests that run statements through ingest, analysis and export.

mod pipeline;
