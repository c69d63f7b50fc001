pub mod product;
pub mod session;
