// Domain Model - engines, payload databases, candidate sets

mod candidate;
mod database;
mod engine;

pub use candidate::CandidateSet;
pub use database::{EngineDatabase, EngineRecord, ProbeExpectations, ProbeTable};
pub use engine::{EngineName, EngineSpec, Exploit, LanguageId};
