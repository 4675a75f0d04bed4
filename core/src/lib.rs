//! Attendance analytics core: a deterministic synthetic member population
//! and the read-only dashboard views computed over it.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod generator;
pub mod member;
pub mod population;
pub mod rng;
pub mod types;

pub use config::{GeneratorConfig, Thresholds};
pub use dashboard::Dashboard;
pub use error::{DashError, DashResult};
pub use generator::{generate, PopulationGenerator};
pub use member::{MemberRecord, ReasonCategory, RfmSegment};
pub use population::{Population, Session};
