pub mod cache;
pub mod provider;
pub mod simulation;
pub mod table;

pub use self::{
    cache::CacheFile,
    provider::{OcvProvider, ProviderStatus, Source},
    simulation::ParameterSet,
    table::OcvTable,
};
