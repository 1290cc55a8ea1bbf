pub mod facts;
pub mod recommender;

pub use facts::{FactProvider, GraphSeed, InMemoryGraph, PgFactProvider};
pub use recommender::{IndexSummary, Recommender};
