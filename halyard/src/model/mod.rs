//! Domain model: learned field mappings, index identities, requests and
//! results

mod field;
mod identity;
mod request;
mod results;

pub use field::{FieldMapping, MappingModel};
pub use identity::{validate_index_name, IdentityDeriver, IndexIdentity, SuffixIdentityDeriver};
pub use request::{
    Document, FacetRequest, FacetSpec, FilterConstraint, IndexSettings, SearchConfig, SearchRequest,
};
pub use results::{AggregationResult, FacetBucket, SearchHit, SearchResults};
