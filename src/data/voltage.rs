use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ConvertError, Result};

/// `<digit>.<digits>` immediately followed by `V`; group 1 excludes the `V`.
fn voltage_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d\.\d+)V").expect("voltage pattern is valid"))
}

/// Extract the voltage-string from a measurement file name.
///
/// The leftmost match wins, so `"0.95V_run2.pickle"` yields `"0.95"`.
pub fn extract_voltage(file_name: &str) -> Result<String> {
    voltage_pattern()
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ConvertError::MissingVoltage {
            file_name: file_name.to_string(),
        })
}
