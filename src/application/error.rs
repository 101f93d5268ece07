use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::blog::BlogError, application::sitemap::SitemapError,
    application::syndication::SyndicationError, domain::error::DomainError,
    infra::catalog::CatalogError, infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("resource not found")]
    NotFound,
    #[error("comments are closed")]
    CommentsClosed,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::CommentsClosed => StatusCode::FORBIDDEN,
            AppError::Catalog(CatalogError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Catalog(CatalogError::Codec(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Infra(_) | AppError::Domain(DomainError::Invariant { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::NotFound => {
                "Resource not found"
            }
            AppError::Domain(DomainError::Validation { .. }) | AppError::Validation(_) => {
                "Request could not be processed"
            }
            AppError::CommentsClosed => "Comments are closed for this post",
            AppError::Catalog(CatalogError::Store(_)) => "Storage temporarily unavailable",
            AppError::Catalog(CatalogError::Codec(_)) => "Stored record could not be read",
            AppError::Infra(InfraError::Configuration { .. }) => "Service misconfigured",
            AppError::Infra(InfraError::Telemetry(_)) => "Logging subsystem could not start",
            AppError::Infra(InfraError::Io(_)) => "I/O failure during request",
            AppError::Domain(DomainError::Invariant { .. }) | AppError::Unexpected(_) => {
                "Unexpected error occurred"
            }
        }
    }
}

impl From<BlogError> for AppError {
    fn from(error: BlogError) -> Self {
        match error {
            BlogError::NotFound => AppError::NotFound,
            BlogError::CommentsClosed => AppError::CommentsClosed,
            BlogError::Validation(message) => AppError::Validation(message.to_string()),
            BlogError::Catalog(err) => AppError::Catalog(err),
        }
    }
}

impl From<SyndicationError> for AppError {
    fn from(error: SyndicationError) -> Self {
        match error {
            SyndicationError::Posts(err) => AppError::Catalog(err),
        }
    }
}

impl From<SitemapError> for AppError {
    fn from(error: SitemapError) -> Self {
        match error {
            SitemapError::Posts(err) => AppError::Catalog(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        tracing::error!(error = %self, status = %status, "request failed");
        (status, message).into_response()
    }
}
