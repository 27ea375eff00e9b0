//! Scenario and variant definitions.
//!
//! A [`Scenario`] groups variants that must return logically equivalent
//! result sets for a fixed database state. Each [`Variant`] wraps one
//! data-access strategy as a no-argument query returning materialized rows.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{BenchError, QueryError};

/// Separator between a variant's base label and its configuration flags.
pub const FLAG_SEPARATOR: char = ':';

/// Stable per-row digest used to compare result sets across variants.
pub trait RowDigest {
    /// Digest of this row. Equal rows must produce equal digests.
    fn row_digest(&self) -> u64;
}

macro_rules! impl_row_digest_via_hash {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RowDigest for $ty {
                fn row_digest(&self) -> u64 {
                    let mut hasher = DefaultHasher::new();
                    self.hash(&mut hasher);
                    hasher.finish()
                }
            }
        )*
    };
}

impl_row_digest_via_hash!(i32, i64, u32, u64, usize, String, &'static str);

/// A materialized result set, type-erased so variants of different row types
/// can share a runner.
pub trait ResultRows {
    /// Number of rows returned.
    fn row_count(&self) -> usize;

    /// Order-independent digest of all rows.
    fn digest(&self) -> u64;
}

impl<R: RowDigest> ResultRows for Vec<R> {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn digest(&self) -> u64 {
        // Wrapping sum so that unordered scans compare equal to ordered ones.
        self.iter()
            .fold(0u64, |acc, row| acc.wrapping_add(row.row_digest()))
    }
}

type BoxedQuery = Box<dyn FnMut() -> Result<Box<dyn ResultRows>, QueryError>>;

/// One data-access strategy measured within a scenario.
pub struct Variant {
    label: String,
    flags: Vec<String>,
    query: BoxedQuery,
}

impl Variant {
    /// Create a variant from a query returning materialized rows.
    ///
    /// Everything the closure does, including acquiring and releasing its
    /// connection, is part of the measured iteration.
    pub fn new<F, R>(label: impl Into<String>, mut query: F) -> Self
    where
        F: FnMut() -> Result<Vec<R>, QueryError> + 'static,
        R: RowDigest + 'static,
    {
        Self {
            label: label.into(),
            flags: Vec::new(),
            query: Box::new(move || query().map(|rows| Box::new(rows) as Box<dyn ResultRows>)),
        }
    }

    /// Attach a configuration flag (e.g. a query mode) to this variant.
    ///
    /// Flags become part of the label: `sqlx` with flag `tracking` reports as
    /// `sqlx:tracking`.
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Full label including flags.
    pub fn label(&self) -> String {
        let mut label = self.label.clone();
        for flag in &self.flags {
            label.push(FLAG_SEPARATOR);
            label.push_str(flag);
        }
        label
    }

    /// Base label without flags.
    pub fn base_label(&self) -> &str {
        &self.label
    }

    /// Configuration flags.
    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Execute the query once. Failures carry this variant's label.
    pub fn execute(&mut self) -> Result<Box<dyn ResultRows>, BenchError> {
        (self.query)().map_err(|source| BenchError::Query {
            variant: self.label(),
            source,
        })
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("label", &self.label)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// A named set of variants expected to produce equivalent results.
#[derive(Debug)]
pub struct Scenario {
    name: String,
    variants: Vec<Variant>,
}

impl Scenario {
    /// Create an empty scenario.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    /// Append a variant. Variants run in insertion order.
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Append a variant in place.
    pub fn push(&mut self, variant: Variant) {
        self.variants.push(variant);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variants_mut(&mut self) -> &mut [Variant] {
        &mut self.variants
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }
}
