use indexmap::IndexMap;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Reading – a number as it will appear in the report
// ---------------------------------------------------------------------------

/// A numeric value that keeps its Python type through to the JSON output:
/// ints stay ints (`5`), floats stay floats (`5.0`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    Int(i128),
    Float(f64),
}

impl Reading {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Reading::Int(i) => i as f64,
            Reading::Float(f) => f,
        }
    }
}

// ---------------------------------------------------------------------------
// Frequency – one measured value, tagged by how it was encoded
// ---------------------------------------------------------------------------

/// A frequency reading as stored in a measurement pickle.
///
/// Two encodings exist in the wild: a bare float, and a 2-D grid (a dict keyed
/// by `(row, col)` tuples or a nested sequence) whose `(0, 0)` cell holds the
/// reading. The decoder resolves the encoding once; downstream code only
/// needs [`Frequency::value`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frequency {
    Scalar(f64),
    /// Value read from cell `(0, 0)` of a grid; may be an int.
    Grid(Reading),
}

impl Frequency {
    pub fn value(&self) -> Reading {
        match *self {
            Frequency::Scalar(v) => Reading::Float(v),
            Frequency::Grid(r) => r,
        }
    }
}

// ---------------------------------------------------------------------------
// Measurement – one decoded input file
// ---------------------------------------------------------------------------

/// All readings from a single measurement file.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Voltage-string taken from the file name, e.g. `"1.05"`.
    pub voltage: String,
    /// address → reading, in the order the file's dict yields them.
    pub readings: IndexMap<String, Frequency>,
}

// ---------------------------------------------------------------------------
// FrequencyReport – the consolidated output document
// ---------------------------------------------------------------------------

/// address → frequency for one voltage.
pub type AddressTable = IndexMap<String, Reading>;

/// voltage → address → frequency, in insertion order.
///
/// Serializes as a plain JSON object of objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FrequencyReport {
    voltages: IndexMap<String, AddressTable>,
}

impl FrequencyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a measurement under its voltage.
    ///
    /// A voltage that is already present is replaced in place and the old
    /// table is returned.
    pub fn insert(&mut self, measurement: Measurement) -> Option<AddressTable> {
        let table: AddressTable = measurement
            .readings
            .into_iter()
            .map(|(addr, freq)| (addr, freq.value()))
            .collect();
        self.voltages.insert(measurement.voltage, table)
    }

    pub fn get(&self, voltage: &str) -> Option<&AddressTable> {
        self.voltages.get(voltage)
    }

    /// Voltages in insertion order.
    pub fn voltages(&self) -> impl Iterator<Item = &str> {
        self.voltages.keys().map(String::as_str)
    }

    /// Number of voltages.
    pub fn len(&self) -> usize {
        self.voltages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltages.is_empty()
    }

    /// Render as pretty JSON (2-space indent, no trailing newline).
    ///
    /// Output is pure ASCII: non-ASCII characters are written as `\uXXXX`
    /// escapes, matching Python's `json.dump` defaults.
    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        let text = serde_json::to_string_pretty(self)?;
        Ok(escape_non_ascii(&text).into_bytes())
    }
}

/// Replace every non-ASCII char with UTF-16 `\uXXXX` escapes.
///
/// Valid on whole serde_json output: non-ASCII can only occur inside strings.
fn escape_non_ascii(json: &str) -> String {
    if json.is_ascii() {
        return json.to_string();
    }
    let mut out = String::with_capacity(json.len() + 16);
    let mut units = [0u16; 2];
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        for unit in c.encode_utf16(&mut units) {
            out.push_str(&format!("\\u{unit:04x}"));
        }
    }
    out
}
