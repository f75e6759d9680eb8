use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde_pickle::DeOptions;

use super::model::{Frequency, Measurement, Reading};
use super::pickled::Pickled;
use super::voltage::extract_voltage;
use crate::error::{ConvertError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load one measurement pickle.
///
/// Expected layout (Python notation):
///
/// ```text
/// [ { 0: 250.5,                     # scalar encoding
///     1: {(0, 0): 260.1, ...},      # grid encoding (dict of cells)
///     2: [[270.0, ...], ...],       # grid encoding (nested sequence)
///   },
///   ...                             # further elements are ignored
/// ]
/// ```
///
/// The voltage comes from the file name, see [`extract_voltage`].
pub fn load_measurement(path: &Path) -> Result<Measurement> {
    let file = File::open(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let options = DeOptions::new().decode_strings();
    let root: Pickled = serde_pickle::from_reader(BufReader::new(file), options)
        .map_err(|source| ConvertError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let readings = decode_readings(path, root)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let voltage = extract_voltage(&file_name)?;

    debug!(
        "{}: {} readings at {voltage}V",
        path.display(),
        readings.len()
    );
    Ok(Measurement { voltage, readings })
}

/// Decode the readings held by an already unpickled object.
///
/// Addresses keep the insertion order of the pickled dict. `path` is only
/// used to label errors.
pub fn decode_readings(path: &Path, root: Pickled) -> Result<IndexMap<String, Frequency>> {
    let entries = match first_element(path, root)? {
        Pickled::Dict(entries) => entries,
        other => return Err(shape(path, "first element", "dict", &other)),
    };

    let mut readings = IndexMap::with_capacity(entries.len());
    for (key, value) in entries {
        let address = python_str(&key);
        let freq = decode_frequency(path, &address, value)?;
        // Distinct keys can share a str() form; the later value wins in place.
        readings.insert(address, freq);
    }
    Ok(readings)
}

// ---------------------------------------------------------------------------
// Schema helpers
// ---------------------------------------------------------------------------

/// `root[0]`: first item of a sequence, or the value under key `0`.
fn first_element(path: &Path, root: Pickled) -> Result<Pickled> {
    let empty = || ConvertError::EmptyContainer {
        path: path.to_path_buf(),
    };
    match root {
        Pickled::Seq(items) => items.into_iter().next().ok_or_else(empty),
        Pickled::Dict(entries) => {
            if entries.is_empty() {
                return Err(empty());
            }
            Pickled::take_entry(entries, |k| k.equals_int(0)).ok_or_else(|| ConvertError::Shape {
                path: path.to_path_buf(),
                context: "top-level dict".to_string(),
                expected: "key 0",
                found: "no key 0".to_string(),
            })
        }
        other => Err(shape(path, "top-level object", "sequence or dict", &other)),
    }
}

fn is_origin(key: &Pickled) -> bool {
    matches!(key, Pickled::Seq(pair) if pair.len() == 2 && pair.iter().all(|c| c.equals_int(0)))
}

fn decode_frequency(path: &Path, address: &str, value: Pickled) -> Result<Frequency> {
    const EXPECTED: &str = "float or 2-D grid";
    let bad = |found: String| ConvertError::Shape {
        path: path.to_path_buf(),
        context: format!("address {address}"),
        expected: EXPECTED,
        found,
    };

    let cell = match value {
        Pickled::Float(v) => return Ok(Frequency::Scalar(v)),
        Pickled::Dict(cells) => Pickled::take_entry(cells, is_origin)
            .ok_or_else(|| bad("dict without a (0, 0) key".to_string()))?,
        Pickled::Seq(rows) => match rows.into_iter().next() {
            Some(Pickled::Seq(cells)) => cells
                .into_iter()
                .next()
                .ok_or_else(|| bad("sequence with an empty first row".to_string()))?,
            Some(row) => return Err(bad(format!("1-D sequence of {}", row.type_name()))),
            None => return Err(bad("empty sequence".to_string())),
        },
        other => return Err(bad(other.type_name().to_string())),
    };

    match cell {
        Pickled::Float(v) => Ok(Frequency::Grid(Reading::Float(v))),
        Pickled::Int(v) => Ok(Frequency::Grid(Reading::Int(v))),
        other => Err(shape(
            path,
            &format!("address {address} cell (0, 0)"),
            "number",
            &other,
        )),
    }
}

fn shape(path: &Path, context: &str, expected: &'static str, found: &Pickled) -> ConvertError {
    ConvertError::Shape {
        path: path.to_path_buf(),
        context: context.to_string(),
        expected,
        found: found.type_name().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Address rendering – Python `str()` / `repr()` of a dict key
// ---------------------------------------------------------------------------

/// Render a key the way Python's `str()` would.
pub fn python_str(key: &Pickled) -> String {
    match key {
        Pickled::Str(s) => s.clone(),
        other => python_repr(other),
    }
}

fn python_repr(key: &Pickled) -> String {
    match key {
        Pickled::None => "None".to_string(),
        Pickled::Bool(true) => "True".to_string(),
        Pickled::Bool(false) => "False".to_string(),
        Pickled::Int(i) => i.to_string(),
        Pickled::Float(f) => float_repr(*f),
        Pickled::Bytes(b) => bytes_repr(b),
        Pickled::Str(s) => {
            let quote = pick_quote(s.contains('\''), s.contains('"'));
            let mut out = String::from(quote);
            for c in s.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    c if c == quote => {
                        out.push('\\');
                        out.push(c);
                    }
                    c => out.push(c),
                }
            }
            out.push(quote);
            out
        }
        // Hashable sequences are tuples.
        Pickled::Seq(items) => {
            let inner: Vec<String> = items.iter().map(python_repr).collect();
            if inner.len() == 1 {
                format!("({},)", inner[0])
            } else {
                format!("({})", inner.join(", "))
            }
        }
        Pickled::Dict(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", python_repr(k), python_repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        // Python: 1e+16, 1.5e-05
        let sci = format!("{f:e}");
        return match sci.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{mantissa}e{sign}{digits:0>2}")
            }
            None => sci,
        };
    }
    if f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// Python prefers single quotes unless only the single quote needs escaping.
fn pick_quote(has_single: bool, has_double: bool) -> char {
    if has_single && !has_double {
        '"'
    } else {
        '\''
    }
}

fn bytes_repr(bytes: &[u8]) -> String {
    let quote = pick_quote(bytes.contains(&b'\''), bytes.contains(&b'"'));
    let mut out = String::from("b");
    out.push(quote);
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b if b == quote as u8 => {
                out.push('\\');
                out.push(quote);
            }
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(entries: Vec<(Pickled, Pickled)>) -> Pickled {
        Pickled::Dict(entries)
    }

    fn int(i: i128) -> Pickled {
        Pickled::Int(i)
    }

    fn grid_rows(rows: &[&[f64]]) -> Pickled {
        Pickled::Seq(
            rows.iter()
                .map(|r| Pickled::Seq(r.iter().map(|&v| Pickled::Float(v)).collect()))
                .collect(),
        )
    }

    fn path() -> &'static Path {
        Path::new("results_1.10V.pickle")
    }

    #[test]
    fn decodes_scalar_readings() {
        let root = Pickled::Seq(vec![dict(vec![
            (int(0), Pickled::Float(250.5)),
            (int(1), Pickled::Float(260.1)),
        ])]);
        let readings = decode_readings(path(), root).unwrap();
        assert_eq!(readings.get("0"), Some(&Frequency::Scalar(250.5)));
        assert_eq!(readings.get("1"), Some(&Frequency::Scalar(260.1)));
    }

    #[test]
    fn addresses_keep_insertion_order() {
        let root = Pickled::Seq(vec![dict(vec![
            (int(10), Pickled::Float(300.0)),
            (int(2), Pickled::Float(200.0)),
            (int(1), Pickled::Float(100.0)),
        ])]);
        let readings = decode_readings(path(), root).unwrap();
        assert_eq!(readings.keys().collect::<Vec<_>>(), ["10", "2", "1"]);
    }

    #[test]
    fn colliding_addresses_overwrite_in_place() {
        // {1: 1.0, '1': 2.0, 3: 3.0} -> "1" stays first with the later value
        let root = Pickled::Seq(vec![dict(vec![
            (int(1), Pickled::Float(1.0)),
            (Pickled::Str("1".into()), Pickled::Float(2.0)),
            (int(3), Pickled::Float(3.0)),
        ])]);
        let readings = decode_readings(path(), root).unwrap();
        assert_eq!(readings.keys().collect::<Vec<_>>(), ["1", "3"]);
        assert_eq!(readings.get("1"), Some(&Frequency::Scalar(2.0)));
    }

    #[test]
    fn decodes_nested_grid() {
        let root = Pickled::Seq(vec![dict(vec![(
            int(5),
            grid_rows(&[&[999.0, 0.0], &[0.0, 0.0]]),
        )])]);
        let readings = decode_readings(path(), root).unwrap();
        assert_eq!(readings.get("5"), Some(&Frequency::Grid(Reading::Float(999.0))));
    }

    #[test]
    fn decodes_cell_dict_grid() {
        let cells = dict(vec![
            (Pickled::Seq(vec![int(0), int(1)]), Pickled::Float(1.0)),
            (Pickled::Seq(vec![int(0), int(0)]), Pickled::Float(412.25)),
        ]);
        let root = Pickled::Seq(vec![dict(vec![(int(3), cells)])]);
        let readings = decode_readings(path(), root).unwrap();
        assert_eq!(readings.get("3"), Some(&Frequency::Grid(Reading::Float(412.25))));
    }

    #[test]
    fn int_grid_cell_stays_an_int() {
        let big: i128 = 9_007_199_254_740_993;
        let root = Pickled::Seq(vec![dict(vec![
            (int(1), dict(vec![(Pickled::Seq(vec![int(0), int(0)]), int(5))])),
            (int(2), Pickled::Seq(vec![Pickled::Seq(vec![int(big)])])),
        ])]);
        let readings = decode_readings(path(), root).unwrap();
        assert_eq!(readings.get("1"), Some(&Frequency::Grid(Reading::Int(5))));
        assert_eq!(readings.get("2"), Some(&Frequency::Grid(Reading::Int(big))));
    }

    #[test]
    fn only_first_element_is_used() {
        let root = Pickled::Seq(vec![
            dict(vec![(int(0), Pickled::Float(1.0))]),
            Pickled::Str("ignored".into()),
        ]);
        assert_eq!(decode_readings(path(), root).unwrap().len(), 1);
    }

    #[test]
    fn top_level_dict_uses_key_zero() {
        let inner = dict(vec![(int(9), Pickled::Float(2.5))]);
        let root = dict(vec![(int(4), Pickled::None), (int(0), inner)]);
        let readings = decode_readings(path(), root).unwrap();
        assert_eq!(readings.get("9"), Some(&Frequency::Scalar(2.5)));
    }

    #[test]
    fn empty_container_is_rejected() {
        let err = decode_readings(path(), Pickled::Seq(vec![])).unwrap_err();
        assert!(matches!(err, ConvertError::EmptyContainer { .. }));
    }

    #[test]
    fn int_reading_is_a_shape_error() {
        let root = Pickled::Seq(vec![dict(vec![(int(0), int(250))])]);
        match decode_readings(path(), root).unwrap_err() {
            ConvertError::Shape { context, found, .. } => {
                assert_eq!(context, "address 0");
                assert_eq!(found, "int");
            }
            other => panic!("expected Shape error, got {other:?}"),
        }
    }

    #[test]
    fn one_dimensional_reading_is_a_shape_error() {
        let root = Pickled::Seq(vec![dict(vec![(
            int(0),
            Pickled::Seq(vec![Pickled::Float(1.0), Pickled::Float(2.0)]),
        )])]);
        let err = decode_readings(path(), root).unwrap_err();
        assert!(matches!(err, ConvertError::Shape { .. }));
    }

    #[test]
    fn string_reading_is_a_shape_error() {
        let root = Pickled::Seq(vec![dict(vec![(int(0), Pickled::Str("fast".into()))])]);
        let err = decode_readings(path(), root).unwrap_err();
        assert!(matches!(err, ConvertError::Shape { .. }));
    }

    #[test]
    fn first_element_must_be_a_dict() {
        let root = Pickled::Seq(vec![Pickled::Seq(vec![Pickled::Float(1.0)])]);
        match decode_readings(path(), root).unwrap_err() {
            ConvertError::Shape { expected, found, .. } => {
                assert_eq!(expected, "dict");
                assert_eq!(found, "sequence");
            }
            other => panic!("expected Shape error, got {other:?}"),
        }
    }

    #[test]
    fn keys_render_like_python_str() {
        assert_eq!(python_str(&int(-3)), "-3");
        assert_eq!(python_str(&Pickled::Str("core7".into())), "core7");
        assert_eq!(python_str(&Pickled::Bool(true)), "True");
        assert_eq!(python_str(&Pickled::None), "None");
        assert_eq!(python_str(&Pickled::Float(1.0)), "1.0");
        assert_eq!(python_str(&Pickled::Float(0.5)), "0.5");
        assert_eq!(python_str(&Pickled::Float(1e16)), "1e+16");
        assert_eq!(python_str(&Pickled::Float(1.5e-5)), "1.5e-05");
        assert_eq!(python_str(&Pickled::Bytes(b"a'\x00".to_vec())), "b\"a'\\x00\"");
        assert_eq!(python_str(&Pickled::Bytes(b"ab".to_vec())), "b'ab'");
        assert_eq!(
            python_str(&Pickled::Seq(vec![int(1), Pickled::Str("x".into())])),
            "(1, 'x')"
        );
        assert_eq!(python_str(&Pickled::Seq(vec![int(4)])), "(4,)");
    }
}
