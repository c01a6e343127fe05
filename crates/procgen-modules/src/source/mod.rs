//! Source generators: place single objects

pub mod object;

pub use object::ObjectGenerator;
