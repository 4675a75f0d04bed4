//! The generated table and the session that owns it.
//!
//! A `Population` is immutable once built. `Session` computes it on
//! first access and hands out shared references for the rest of its
//! lifetime; nothing can write to it afterwards.

use crate::{
    config::GeneratorConfig,
    error::{DashError, DashResult},
    generator::PopulationGenerator,
    member::MemberRecord,
    types::{MemberId, Seed},
};
use once_cell::sync::OnceCell;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Population {
    seed: Seed,
    members: Vec<MemberRecord>,
}

impl Population {
    pub(crate) fn new(seed: Seed, members: Vec<MemberRecord>) -> Self {
        Self { seed, members }
    }

    pub fn seed(&self) -> Seed {
        self.seed
    }

    pub fn members(&self) -> &[MemberRecord] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberRecord> {
        self.members.iter()
    }

    /// Ids are 1..=N and stored in order.
    pub fn get_by_id(&self, id: MemberId) -> Option<&MemberRecord> {
        let idx = (id as usize).checked_sub(1)?;
        self.members.get(idx).filter(|m| m.id == id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&MemberRecord> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn require(&self, name: &str) -> DashResult<&MemberRecord> {
        self.get_by_name(name).ok_or_else(|| DashError::MemberNotFound {
            name: name.to_string(),
        })
    }
}

/// One interactive session: a generator plus its lazily built table.
pub struct Session {
    generator: PopulationGenerator,
    population: OnceCell<Population>,
}

impl Session {
    pub fn new(config: GeneratorConfig) -> DashResult<Self> {
        Ok(Self {
            generator: PopulationGenerator::new(config)?,
            population: OnceCell::new(),
        })
    }

    pub fn is_generated(&self) -> bool {
        self.population.get().is_some()
    }

    /// Generates on first call; later calls return the same table.
    pub fn population(&self) -> DashResult<&Population> {
        self.population
            .get_or_try_init(|| self.generator.generate_default())
    }
}
