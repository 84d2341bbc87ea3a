//! Terminal interaction

pub mod chooser;
