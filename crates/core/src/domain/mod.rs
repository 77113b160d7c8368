pub mod group;
pub mod product;
