//! Request synthesis: generic search and facet requests to engine DSL

mod addressing;
mod facets;
mod query;

pub use addressing::Addressing;
pub use facets::{FacetSynthesizer, FACET_VALUES_AGG};
pub use query::{normalize_boosts, QuerySynthesizer};
