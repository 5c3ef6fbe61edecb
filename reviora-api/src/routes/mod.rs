/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Account authentication (register, login, refresh)
/// - `questionnaires`: Questionnaire CRUD, publish, export
/// - `questions`: Question management within a questionnaire
/// - `responses`: Public response submission and owner listing
/// - `reviews`: Review submission, listing, publish toggle
/// - `analytics`: Response summaries and answer breakdowns
/// - `subscription`: Plans, usage, upgrade requests
/// - `admin_auth`: Enterprise admin login, 2FA, logout
/// - `admin`: Admin panel endpoints (requests, users, transactions)
/// - `api_keys`: API key management endpoints

pub mod admin;
pub mod admin_auth;
pub mod analytics;
pub mod api_keys;
pub mod auth;
pub mod health;
pub mod questionnaires;
pub mod questions;
pub mod responses;
pub mod reviews;
pub mod subscription;

use axum::Json;
use serde::Serialize;

/// Success response envelope
///
/// Every successful endpoint wraps its payload as
/// `{"success": true, "data": ...}`, mirroring the error envelope in
/// [`crate::error::ErrorResponse`].
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Always `true` for successes
    pub success: bool,

    /// The endpoint payload
    pub data: T,
}

/// Wraps a payload in the success envelope
pub fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
    })
}
