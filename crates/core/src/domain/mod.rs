pub mod channel;
pub mod discount;
pub mod divider;
pub mod product;
pub mod session;
pub mod snapshot;
