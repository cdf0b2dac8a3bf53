//! Command-line surface of the `brushscan` batch tool.

pub mod cli;
