pub mod deck;
pub mod report;
