use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

// ---------------------------------------------------------------------------
// Pickled – a decoded pickle object with dict order preserved
// ---------------------------------------------------------------------------

/// A dynamically-typed unpickled value.
///
/// Dict entries stay in stream order, which is the insertion order of the
/// Python dict that was pickled. Lists, tuples and sets all arrive as
/// sequences.
#[derive(Debug, Clone, PartialEq)]
pub enum Pickled {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Bytes(Vec<u8>),
    Str(String),
    Seq(Vec<Pickled>),
    Dict(Vec<(Pickled, Pickled)>),
}

impl Pickled {
    /// Python-ish type name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Pickled::None => "None",
            Pickled::Bool(_) => "bool",
            Pickled::Int(_) => "int",
            Pickled::Float(_) => "float",
            Pickled::Bytes(_) => "bytes",
            Pickled::Str(_) => "str",
            Pickled::Seq(_) => "sequence",
            Pickled::Dict(_) => "dict",
        }
    }

    /// Python `==` against an integer: `0 == False == 0.0`.
    pub fn equals_int(&self, n: i128) -> bool {
        match *self {
            Pickled::Int(i) => i == n,
            Pickled::Bool(b) => i128::from(b) == n,
            Pickled::Float(f) => f == n as f64,
            _ => false,
        }
    }

    /// Look up a dict entry by key predicate (first match, like a Python dict).
    pub fn take_entry(
        entries: Vec<(Pickled, Pickled)>,
        mut is_key: impl FnMut(&Pickled) -> bool,
    ) -> Option<Pickled> {
        entries.into_iter().find(|(k, _)| is_key(k)).map(|(_, v)| v)
    }
}

impl<'de> Deserialize<'de> for Pickled {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(PickledVisitor)
    }
}

struct PickledVisitor;

impl<'de> Visitor<'de> for PickledVisitor {
    type Value = Pickled;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any unpickled value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Pickled, E> {
        Ok(Pickled::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Pickled, E> {
        Ok(Pickled::Int(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Pickled, E> {
        Ok(Pickled::Int(v.into()))
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Pickled, E> {
        Ok(Pickled::Int(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Pickled, E> {
        Ok(Pickled::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Pickled, E> {
        Ok(Pickled::Str(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Pickled, E> {
        Ok(Pickled::Str(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Pickled, E> {
        Ok(Pickled::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Pickled, E> {
        Ok(Pickled::Bytes(v))
    }

    fn visit_none<E: de::Error>(self) -> Result<Pickled, E> {
        Ok(Pickled::None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Pickled, E> {
        Ok(Pickled::None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Pickled, D::Error>
    where
        D: Deserializer<'de>,
    {
        Pickled::deserialize(deserializer)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Pickled, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Pickled::Seq(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Pickled, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry()? {
            entries.push(entry);
        }
        Ok(Pickled::Dict(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_pickle::DeOptions;

    #[test]
    fn dict_keeps_stream_order() {
        // pickle.dumps({10: 1.0, 2: 2.0, 1: 3.0}, protocol=2)
        let bytes = b"\x80\x02}q\x00(K\nG?\xf0\x00\x00\x00\x00\x00\x00K\x02G@\x00\x00\x00\x00\x00\x00\x00K\x01G@\x08\x00\x00\x00\x00\x00\x00u.";
        let value: Pickled = serde_pickle::from_slice(bytes, DeOptions::new()).unwrap();
        let entries = match value {
            Pickled::Dict(entries) => entries,
            other => panic!("expected dict, got {other:?}"),
        };
        let keys: Vec<&Pickled> = entries.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, [&Pickled::Int(10), &Pickled::Int(2), &Pickled::Int(1)]);
    }

    #[test]
    fn equals_int_follows_python_equality() {
        assert!(Pickled::Int(0).equals_int(0));
        assert!(Pickled::Bool(false).equals_int(0));
        assert!(Pickled::Float(0.0).equals_int(0));
        assert!(!Pickled::Str("0".into()).equals_int(0));
        assert!(!Pickled::Int(1).equals_int(0));
    }

    #[test]
    fn take_entry_returns_first_match() {
        let entries = vec![
            (Pickled::Int(1), Pickled::Float(1.0)),
            (Pickled::Int(0), Pickled::Float(2.0)),
        ];
        let found = Pickled::take_entry(entries, |k| k.equals_int(0));
        assert_eq!(found, Some(Pickled::Float(2.0)));
    }
}
