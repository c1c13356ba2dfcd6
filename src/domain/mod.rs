pub mod error;
pub mod geography;
pub mod population;
pub mod sales;
pub mod transaction;
