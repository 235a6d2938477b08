//! Sensor time-series shaping for Tempdash
//!
//! Decodes daily reading documents, aligns samples onto a fixed 5-minute
//! grid, fills hourly average gaps, and formats "time since" strings.

pub mod normalize;
pub mod relative;
pub mod types;

pub use normalize::{
    adjust_hourly, build_day_entry, expand_to_grid, fill_missing_hours, hourly_values,
    wrap_hourly, GRID_SLOTS, SLOT_MINUTES,
};
pub use relative::format_distance;
pub use types::*;
