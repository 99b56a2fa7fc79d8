pub mod expr;
pub mod node;
pub mod types;
