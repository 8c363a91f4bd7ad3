//! Prequalification Widget Library
//!
//! This library provides the core functionality for the embeddable credit
//! prequalification widget and the API server behind it: applicant validation,
//! zip-code resolution, CAPTCHA gating, the submission state machine, template
//! rendering and the staff notification batch.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core widget logic.
//! - `integrations`: External service integrations.
//! - `obs`: Observability and logging.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `gateway_client`: Widget-side client for the widget API.
//! - `gating`: CAPTCHA token provider seam and server-side verifier.
//! - `handlers`: HTTP request handlers.
//! - `host`: Signals to the embedding page.
//! - `models`: Core data models and wire types.
//! - `notification`: Email batch construction and dispatch.
//! - `orchestrator`: Submission state machine.
//! - `routes`: Router and middleware stack.
//! - `services`: Credit backend and zip dataset clients.
//! - `session`: Per-page-load widget session.
//! - `templates`: Template store and renderer.
//! - `theme`: Widget options from the embed query string.
//! - `validation`: Applicant validation rules.
//! - `zip_resolution`: Zip lookup outcomes.

pub mod api;
pub mod core;
pub mod integrations;
pub mod obs;

pub mod config;
pub mod errors;
pub mod gateway_client;
pub mod gating;
pub mod handlers;
pub mod host;
pub mod models;
pub mod notification;
pub mod orchestrator;
pub mod routes;
pub mod services;
pub mod session;
pub mod templates;
pub mod theme;
pub mod validation;
pub mod zip_resolution;

#[cfg(test)]
pub(crate) mod fixtures;
