//! Entity definitions for the database layer

pub mod message;
