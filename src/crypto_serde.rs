//! Serde helpers for the wire representations: big integers as decimal
//! strings, byte strings as lowercase hex. Group elements carry their
//! own hex serde impls next to their types.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serializer};

/// Serde helpers for `BigUint` encoded as a decimal string.
pub mod decimal {
    use super::*;
    use num_bigint::BigUint;

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<BigUint>()
            .map_err(|e| DeError::custom(format!("invalid decimal integer: {e}")))
    }
}

/// Serde helpers for `Vec<BigUint>` in decimal.
pub mod decimal_vec {
    use super::*;
    use num_bigint::BigUint;

    pub fn serialize<S: Serializer>(values: &[BigUint], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| v.to_str_radix(10)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<BigUint>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|s| {
                s.parse::<BigUint>()
                    .map_err(|e| DeError::custom(format!("invalid decimal integer: {e}")))
            })
            .collect()
    }
}

/// Serde helpers for `ByteString` as lowercase hex.
pub mod hex_bytes {
    use super::*;
    use crate::bytes::ByteString;

    pub fn serialize<S: Serializer>(value: &ByteString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ByteString, D::Error> {
        let s = String::deserialize(deserializer)?;
        ByteString::from_hex(&s).map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;
    use serde::Serialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Carrier {
        #[serde(with = "decimal")]
        n: BigUint,
        #[serde(with = "decimal_vec")]
        ns: Vec<BigUint>,
    }

    #[test]
    fn decimal_round_trip() {
        let c = Carrier {
            n: BigUint::parse_bytes(b"123456789012345678901234567890", 10).unwrap(),
            ns: vec![BigUint::from(0u8), BigUint::from(77u8)],
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"123456789012345678901234567890\""));
        assert_eq!(serde_json::from_str::<Carrier>(&json).unwrap(), c);
    }

    #[test]
    fn decimal_rejects_non_numeric() {
        assert!(serde_json::from_str::<Carrier>("{\"n\":\"12x\",\"ns\":[]}").is_err());
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Blob {
        #[serde(with = "hex_bytes")]
        data: crate::bytes::ByteString,
    }

    #[test]
    fn byte_strings_serialize_as_lowercase_hex() {
        let blob = Blob {
            data: crate::bytes::ByteString::new(vec![0xAB, 0xCD]),
        };
        let json = serde_json::to_string(&blob).unwrap();
        assert_eq!(json, "{\"data\":\"abcd\"}");
        assert_eq!(serde_json::from_str::<Blob>(&json).unwrap(), blob);
    }
}
