//! # Validation Module
//!
//! Input validation for the entities users edit directly: products,
//! customers and settings.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation                                                 │
//! │  └── Immediate feedback on empty fields                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: backoffice command                                           │
//! │  └── THIS MODULE: business rule validation before any write            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL / CHECK constraints                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{Customer, Product, Settings};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_REFERENCE_LEN: usize = 50;
const MAX_TEXT_LEN: usize = 1_000;

// =============================================================================
// Field Validators
// =============================================================================

/// Checks that a trimmed field is present and not longer than `max`.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    validate_length(field, value, max)
}

fn validate_length(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Accepts an empty email; otherwise requires `local@domain.tld`.
///
/// ## Example
/// ```rust
/// use comptoir_core::validation::validate_email;
///
/// assert!(validate_email("").is_ok());
/// assert!(validate_email("contact@client.com").is_ok());
/// assert!(validate_email("contact.client.com").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(());
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "expected name@domain".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }
    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a product before it is saved.
///
/// ## Rules
/// - Name required, at most 200 characters
/// - Reference at most 50 characters (an empty one is generated on save)
/// - Purchase and sale price not negative
/// - Stock not negative
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_required("name", &product.name, MAX_NAME_LEN)?;
    validate_length("reference", product.reference.trim(), MAX_REFERENCE_LEN)?;
    validate_length("description", &product.description, MAX_TEXT_LEN)?;

    if product.purchase_price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "purchase price".to_string(),
        });
    }
    if product.sale_price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "sale price".to_string(),
        });
    }
    if product.stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }
    Ok(())
}

/// Validates a customer before it is saved.
pub fn validate_customer(customer: &Customer) -> ValidationResult<()> {
    validate_required("name", &customer.name, MAX_NAME_LEN)?;
    validate_email(&customer.email)?;
    validate_length("address", &customer.address, MAX_TEXT_LEN)?;
    if let Some(ice) = &customer.ice {
        validate_length("ICE", ice.trim(), MAX_REFERENCE_LEN)?;
    }
    Ok(())
}

/// Validates settings before they are saved.
///
/// The tax rate is a fraction and must lie in `0..=1` (0% to 100%).
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    validate_required("company name", &settings.company_info.name, MAX_NAME_LEN)?;
    validate_email(&settings.company_info.email)?;

    if !settings.tax_rate.is_finite() || !(0.0..=1.0).contains(&settings.tax_rate) {
        return Err(ValidationError::OutOfRange {
            field: "tax rate (%)".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

/// Irreversible actions (deleting, clearing, converting) must be confirmed.
pub fn require_confirmation(confirmed: bool, action: &str) -> ValidationResult<()> {
    if confirmed {
        Ok(())
    } else {
        Err(ValidationError::ConfirmationRequired {
            action: action.to_string(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
