// Domain layer - Core pipeline types, rules and errors

pub mod errors;
pub mod model;
pub mod rules;
