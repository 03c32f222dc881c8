#![allow(dead_code)]

pub mod faulty_store;
pub mod fixtures;

pub use faulty_store::FaultyStore;
pub use fixtures::*;
