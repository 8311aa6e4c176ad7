pub mod neighbourhood;
pub mod search;
pub mod working_solution;
