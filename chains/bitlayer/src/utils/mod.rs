pub mod erc20;
pub mod gas;
pub mod units;

pub use gas::*;
pub use units::*;
