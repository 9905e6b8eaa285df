pub mod driver;
pub mod outcome;
pub mod worker;
