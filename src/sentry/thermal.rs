//! SoC temperature readings logged alongside captures.

use std::fs;
use std::path::Path;

/// Read a sysfs thermal zone (millidegrees Celsius) as degrees Celsius.
///
/// Missing or unreadable zones yield `None`.
pub fn read_celsius(path: &Path) -> Option<f32> {
    let raw = fs::read_to_string(path).ok()?;
    parse_millicelsius(&raw)
}

/// Parse a sysfs temperature value such as `"48312\n"`.
pub fn parse_millicelsius(raw: &str) -> Option<f32> {
    let millicelsius = raw.trim().parse::<i32>().ok()?;
    Some(millicelsius as f32 / 1000.0)
}
