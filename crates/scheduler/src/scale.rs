//! Scale duration estimates to the size of the input they run against.
//!
//! Estimates are usually measured against one reference input size. When a benchmark runs on an
//! input of a different size, every estimate in that batch, including the setup task, is
//! multiplied by `observed / reference`.

use error_stack::{Report, ResultExt};

use crate::ValidationError;

/// Multiply `duration` by `factor`, rounding half to even. The result is never clamped, so a
/// small enough factor can round a duration down to zero.
pub fn rescale(duration: i64, factor: f64) -> i64 {
    (duration as f64 * factor).round_ties_even() as i64
}

/// A validated ratio between an observed input size and a reference size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactor(f64);

impl Default for ScaleFactor {
    fn default() -> Self {
        ScaleFactor::IDENTITY
    }
}

impl ScaleFactor {
    pub const IDENTITY: ScaleFactor = ScaleFactor(1.0);

    /// Create a factor from a raw ratio. It must be finite and not negative.
    pub fn new(factor: f64) -> Result<Self, Report<ValidationError>> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(Report::new(ValidationError::InvalidScaleFactor))
                .attach_printable_lazy(|| format!("Factor {factor}"));
        }

        Ok(ScaleFactor(factor))
    }

    /// The factor `observed / reference`. A zero reference size is rejected.
    pub fn from_sizes(observed: u64, reference: u64) -> Result<Self, Report<ValidationError>> {
        if reference == 0 {
            return Err(Report::new(ValidationError::InvalidScaleFactor))
                .attach_printable("Reference size is zero");
        }

        Self::new(observed as f64 / reference as f64)
    }

    /// The factor that undoes this one, if there is one.
    pub fn inverse(&self) -> Option<ScaleFactor> {
        (self.0 > 0.0).then(|| ScaleFactor(1.0 / self.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0 == 1.0
    }

    pub fn apply(&self, duration: i64) -> i64 {
        rescale(duration, self.0)
    }
}

/// Parse a size such as `200Mi`, `4K`, or `1048576` into bytes.
///
/// Suffixes are case sensitive. `K`, `M`, `G` and `T` are powers of 1000, while `Ki`, `Mi`, `Gi`
/// and `Ti` are powers of 1024.
pub fn parse_size(input: &str) -> Result<u64, Report<ValidationError>> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);

    let invalid = || Report::new(ValidationError::InvalidSize(input.to_string()));

    let value = digits.parse::<u64>().map_err(|_| invalid())?;
    let multiplier: u64 = match suffix {
        "" => 1,
        "K" => 1_000,
        "Ki" => 1 << 10,
        "M" => 1_000_000,
        "Mi" => 1 << 20,
        "G" => 1_000_000_000,
        "Gi" => 1 << 30,
        "T" => 1_000_000_000_000,
        "Ti" => 1 << 40,
        _ => {
            return Err(invalid()).attach_printable_lazy(|| format!("Unknown suffix {suffix:?}"))
        }
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(invalid)
        .attach_printable("Size overflows 64 bits")
}
