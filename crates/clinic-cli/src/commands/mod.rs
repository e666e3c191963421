//! Command handlers grouped by concern.

pub(crate) mod board;
pub(crate) mod console;
pub(crate) mod probe;
pub(crate) mod records;
pub(crate) mod seed;
