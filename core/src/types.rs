//! Shared primitive types used across the entire crate.

/// A member identifier, unique within a population, 1..=N.
pub type MemberId = u32;

/// The session seed every random stream is derived from.
pub type Seed = u64;
