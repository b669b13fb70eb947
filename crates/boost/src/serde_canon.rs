//! Canonical JSON for models
//!
//! Values go through `serde_json::Value`, whose object map is a `BTreeMap`
//! while the `preserve_order` feature stays off, so keys come out sorted at
//! every depth. A model therefore always serializes to the same bytes and its
//! BLAKE3 digest is stable between runs.

use serde::Serialize;

/// Pretty-printed JSON with keys sorted at every level
pub fn canonical_json_string<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::to_value(value)?)
}

/// BLAKE3 digest of the canonical JSON form, hex encoded
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let json = canonical_json_string(value)?;
    Ok(hex::encode(blake3::hash(json.as_bytes()).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Sample {
        zeta: u32,
        alpha: HashMap<String, f64>,
    }

    #[test]
    fn test_keys_are_sorted() {
        let mut alpha = HashMap::new();
        alpha.insert("b".to_string(), 2.0);
        alpha.insert("a".to_string(), 1.0);
        let json = canonical_json_string(&Sample { zeta: 1, alpha }).unwrap();

        let alpha_pos = json.find("\"alpha\"").unwrap();
        let zeta_pos = json.find("\"zeta\"").unwrap();
        assert!(alpha_pos < zeta_pos);
        assert!(json.find("\"a\"").unwrap() < json.find("\"b\"").unwrap());
    }

    #[test]
    fn test_nested_keys_sorted_inside_arrays() {
        #[derive(Serialize)]
        struct Inner {
            y: u8,
            x: u8,
        }
        #[derive(Serialize)]
        struct Outer {
            items: Vec<Inner>,
        }

        let json = canonical_json_string(&Outer {
            items: vec![Inner { y: 2, x: 1 }],
        })
        .unwrap();
        assert!(json.find("\"x\"").unwrap() < json.find("\"y\"").unwrap());
    }

    #[test]
    fn test_hash_is_stable() {
        let make = || {
            let mut alpha = HashMap::new();
            for i in 0..32 {
                alpha.insert(format!("k{i}"), i as f64);
            }
            Sample { zeta: 7, alpha }
        };
        let h1 = canonical_hash_hex(&make()).unwrap();
        let h2 = canonical_hash_hex(&make()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }
}
