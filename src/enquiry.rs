//! Enquiry form: validation and hand-off to a submission callback.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

use crate::models::{Enquiry, ListingId};

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // local@domain.tld, no whitespace, one @
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Message,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Message => "message",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

/// Every problem with the form, reported together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn for_field(&self, field: Field) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid enquiry: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("could not send enquiry: {0}")]
    Transport(anyhow::Error),
}

/// Raw form input
#[derive(Debug, Clone, Default)]
pub struct EnquiryForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl EnquiryForm {
    pub fn validate(&self, listing_id: &ListingId) -> Result<Enquiry, ValidationErrors> {
        let name = self.name.trim();
        let email = self.email.trim();
        let message = self.message.trim();

        let mut errors = Vec::new();
        if name.is_empty() {
            errors.push(FieldError {
                field: Field::Name,
                message: "Name is required",
            });
        }
        if email.is_empty() {
            errors.push(FieldError {
                field: Field::Email,
                message: "Email is required",
            });
        } else if !email_pattern().is_match(email) {
            errors.push(FieldError {
                field: Field::Email,
                message: "Please enter a valid email address",
            });
        }
        if message.is_empty() {
            errors.push(FieldError {
                field: Field::Message,
                message: "Message is required",
            });
        }
        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        Ok(Enquiry {
            listing_id: listing_id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Validate, then hand the enquiry to `sink`. Invalid forms never reach it.
    pub async fn submit(
        &self,
        listing_id: &ListingId,
        sink: &dyn EnquirySink,
    ) -> Result<Enquiry, SubmitError> {
        let enquiry = self.validate(listing_id)?;
        sink.submit(&enquiry).await.map_err(SubmitError::Transport)?;
        Ok(enquiry)
    }
}

/// Where validated enquiries go
#[async_trait]
pub trait EnquirySink: Send + Sync {
    async fn submit(&self, enquiry: &Enquiry) -> Result<()>;
}

/// Writes the enquiry to the log and nothing else
pub struct LogEnquirySink;

#[async_trait]
impl EnquirySink for LogEnquirySink {
    async fn submit(&self, enquiry: &Enquiry) -> Result<()> {
        info!(
            listing_id = %enquiry.listing_id,
            name = %enquiry.name,
            email = %enquiry.email,
            message = %enquiry.message,
            timestamp = %enquiry.timestamp,
            "📨 Enquiry submitted"
        );
        Ok(())
    }
}
