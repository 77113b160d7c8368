pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod search;

pub use catalog::CatalogSource;
pub use domain::group::{
    PriceComparison, ProductGroup, RankedGroup, RecommendationCandidate, StorePrice,
};
pub use domain::product::{CatalogRecord, ProductId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use search::{IndexGeneration, IndexStats, SearchService, SearchSettings};
