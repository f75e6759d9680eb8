use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use log::info;
use serde_pickle::{HashableValue, SerOptions, Value};

/// Cores per simulated chip.
const ADDRESSES: i64 = 16;

/// Supply voltages to write one file for.
const VOLTAGES: [&str; 5] = ["0.80", "0.90", "1.00", "1.10", "1.20"];

/// Cores per row of the simulated die.
const DIE_WIDTH: i64 = 4;

/// Per-core speed offset in MHz from its position on the die.
///
/// Cores near the centre run faster; a fixed per-core skew stands in for
/// process variation so every run writes the same files.
fn core_offset(address: i64) -> f64 {
    let centre = (DIE_WIDTH - 1) as f64 / 2.0;
    let (row, col) = ((address / DIE_WIDTH) as f64, (address % DIE_WIDTH) as f64);
    let distance = ((row - centre).powi(2) + (col - centre).powi(2)).sqrt();
    let skew = ((address * 37 + 11) % 23 - 11) as f64;
    40.0 - 18.0 * distance + skew
}

/// Max frequency in MHz: roughly linear above threshold.
fn core_frequency(voltage: f64, address: i64, step: usize) -> f64 {
    // Small measurement wobble that differs per voltage step.
    let wobble = (((address + 3) * (step as i64 + 5)) % 7 - 3) as f64 * 0.75;
    let mhz = 1500.0 * (voltage - 0.55) + core_offset(address) + wobble;
    (mhz * 100.0).round() / 100.0
}

/// Encode a reading the way different tool versions did.
fn encode_reading(address: i64, freq: f64) -> Value {
    match address % 3 {
        0 => Value::F64(freq),
        // 2x2 grid as nested lists, reading in the top-left cell
        1 => Value::List(vec![
            Value::List(vec![Value::F64(freq), Value::F64(0.0)]),
            Value::List(vec![Value::F64(0.0), Value::F64(0.0)]),
        ]),
        // grid as a dict of (row, col) cells
        _ => {
            let mut cells = BTreeMap::new();
            for (row, col) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let v = if (row, col) == (0, 0) { freq } else { 0.0 };
                cells.insert(
                    HashableValue::Tuple(vec![HashableValue::I64(row), HashableValue::I64(col)]),
                    Value::F64(v),
                );
            }
            Value::Dict(cells)
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    for (step, voltage) in VOLTAGES.into_iter().enumerate() {
        let v: f64 = voltage.parse().context("parsing sample voltage")?;

        let mut readings = BTreeMap::new();
        for address in 0..ADDRESSES {
            let freq = core_frequency(v, address, step);
            readings.insert(HashableValue::I64(address), encode_reading(address, freq));
        }

        // Second element mimics the run metadata the tool appends; readers ignore it.
        let mut meta = BTreeMap::new();
        meta.insert(HashableValue::String("voltage".into()), Value::F64(v));
        let root = Value::List(vec![Value::Dict(readings), Value::Dict(meta)]);

        let output_path = format!("measurements_{voltage}V.pickle");
        let file =
            File::create(&output_path).with_context(|| format!("creating {output_path}"))?;
        let mut writer = BufWriter::new(file);
        serde_pickle::value_to_writer(&mut writer, &root, SerOptions::new())
            .with_context(|| format!("writing {output_path}"))?;
        writer
            .flush()
            .with_context(|| format!("flushing {output_path}"))?;
        info!("wrote {output_path}");
    }

    println!(
        "Wrote {} measurement files ({ADDRESSES} addresses each)",
        VOLTAGES.len()
    );
    Ok(())
}
