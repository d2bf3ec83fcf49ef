// Core modules implementing the row model, wire encoding, and error modeling.
pub mod error;
pub mod tuple;
pub mod wire;
