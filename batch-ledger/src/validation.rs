//! Field validation for batch operations
//!
//! String bounds count Unicode scalar values, not bytes.

use crate::{
    types::{BatchHash, BatchUpdate, NewBatch},
    Error, Result,
};

/// Maximum produce type length
pub const MAX_PRODUCE_TYPE_LEN: usize = 50;
/// Maximum metadata length
pub const MAX_METADATA_LEN: usize = 500;
/// Maximum number of organic practices
pub const MAX_PRACTICES: usize = 10;
/// Maximum length of a single organic practice
pub const MAX_PRACTICE_LEN: usize = 100;
/// Maximum version notes length
pub const MAX_VERSION_NOTES_LEN: usize = 200;

/// Validate the fields of a new batch
pub fn validate_new_batch(batch: &NewBatch) -> Result<BatchHash> {
    validate_produce_type(&batch.produce_type)?;
    validate_metadata(&batch.metadata)?;
    validate_practices(&batch.organic_practices)?;
    validate_hash(&batch.batch_hash)
}

/// Validate only the fields present in an update, plus the version notes.
///
/// Returns the parsed hash when one was supplied.
pub fn validate_update(update: &BatchUpdate) -> Result<Option<BatchHash>> {
    if let Some(ref produce_type) = update.produce_type {
        validate_produce_type(produce_type)?;
    }
    if let Some(ref metadata) = update.metadata {
        validate_metadata(metadata)?;
    }
    if let Some(ref practices) = update.organic_practices {
        validate_practices(practices)?;
    }
    let hash = match update.batch_hash {
        Some(ref bytes) => Some(validate_hash(bytes)?),
        None => None,
    };
    check_len("version notes", &update.version_notes, MAX_VERSION_NOTES_LEN)?;
    Ok(hash)
}

fn validate_produce_type(produce_type: &str) -> Result<()> {
    check_len("produce type", produce_type, MAX_PRODUCE_TYPE_LEN)
}

fn validate_metadata(metadata: &str) -> Result<()> {
    check_len("metadata", metadata, MAX_METADATA_LEN)
}

fn validate_practices(practices: &[String]) -> Result<()> {
    if practices.len() > MAX_PRACTICES {
        return Err(Error::InvalidInput(format!(
            "{} organic practices (max {})",
            practices.len(),
            MAX_PRACTICES
        )));
    }

    for (index, practice) in practices.iter().enumerate() {
        if practice.is_empty() {
            return Err(Error::InvalidInput(format!(
                "organic practice {} is empty",
                index
            )));
        }
        check_len("organic practice", practice, MAX_PRACTICE_LEN)?;
    }

    Ok(())
}

fn validate_hash(bytes: &[u8]) -> Result<BatchHash> {
    if bytes.is_empty() {
        return Err(Error::InvalidInput("batch hash is empty".into()));
    }
    BatchHash::from_slice(bytes).ok_or_else(|| {
        Error::InvalidInput(format!(
            "batch hash is {} bytes (expected {})",
            bytes.len(),
            BatchHash::LEN
        ))
    })
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(Error::InvalidInput(format!(
            "{} is {} chars (max {})",
            field, len, max
        )));
    }
    Ok(())
}
