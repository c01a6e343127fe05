//! Combine generators: join several upstream modules

pub mod merge;

pub use merge::MergeGenerator;
