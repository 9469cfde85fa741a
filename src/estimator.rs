pub mod coulomb;
pub mod filter;

pub use self::{
    coulomb::CoulombCounter,
    filter::{FilterUpdate, SocFilter},
};
