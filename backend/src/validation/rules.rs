//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Upper bound for an uploaded signature blob (an image data URL in practice).
pub const MAX_SIGNATURE_BYTES: usize = 512 * 1024;

/// Upper bound for a declared absence reason, in characters.
pub const MAX_ABSENCE_REASON_CHARS: usize = 500;

/// Validates a signature blob.
///
/// Requirements:
/// - Not blank
/// - At most [`MAX_SIGNATURE_BYTES`] bytes
pub fn validate_signature_blob(signature: &str) -> Result<(), ValidationError> {
    if signature.trim().is_empty() {
        return Err(ValidationError::new("signature_required"));
    }
    if signature.len() > MAX_SIGNATURE_BYTES {
        return Err(ValidationError::new("signature_too_large"));
    }
    Ok(())
}

/// Validates a declared absence reason.
///
/// Requirements:
/// - Not blank
/// - At most [`MAX_ABSENCE_REASON_CHARS`] characters
pub fn validate_absence_reason(reason: &str) -> Result<(), ValidationError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new("reason_required"));
    }
    if trimmed.chars().count() > MAX_ABSENCE_REASON_CHARS {
        return Err(ValidationError::new("reason_too_long"));
    }
    Ok(())
}
