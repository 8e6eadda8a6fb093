pub mod customers;
pub mod fixtures;
pub mod locations;
pub mod pipeline;
