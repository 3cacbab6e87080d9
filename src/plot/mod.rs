//! Terminal plotting.

pub mod ascii;

pub use ascii::{render_scatter, render_time_chart};
