//! Random integer generation
//!
//! Stateless helpers drawing uniformly distributed integers from an
//! inclusive range. Invalid input is reported, never silently corrected.

use rand::Rng;
use thiserror::Error;

/// Generation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("minimum {min} is greater than maximum {max}")]
    InvalidRange { min: i64, max: i64 },
    #[error("count must be greater than 0, got {count}")]
    InvalidCount { count: i32 },
}

/// Draw one integer uniformly from `[min, max]`, both bounds inclusive.
///
/// The full `i64` domain is a valid range; the sampler handles spans wider
/// than `i64::MAX` without overflow.
pub fn generate(min: i64, max: i64) -> Result<i64, GeneratorError> {
    if min > max {
        return Err(GeneratorError::InvalidRange { min, max });
    }
    Ok(rand::thread_rng().gen_range(min..=max))
}

/// Draw `count` integers from `[min, max]`, returned in draw order.
///
/// Draws are independent and with replacement, so duplicates are expected.
pub fn generate_multiple(min: i64, max: i64, count: i32) -> Result<Vec<i64>, GeneratorError> {
    if min > max {
        return Err(GeneratorError::InvalidRange { min, max });
    }
    if count <= 0 {
        return Err(GeneratorError::InvalidCount { count });
    }
    let mut rng = rand::thread_rng();
    Ok((0..count).map(|_| rng.gen_range(min..=max)).collect())
}
