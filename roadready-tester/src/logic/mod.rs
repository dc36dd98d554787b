pub mod driver;
pub mod reports;
pub mod tester;

pub use driver::{Playthrough, TesterAssets};
pub use tester::*;
