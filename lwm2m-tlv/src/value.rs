//! Leaf value encoding
//!
//! Integers are big-endian two's complement using the smallest of 1, 2, 4 or
//! 8 bytes that holds the value. Floats use 4 bytes when the value survives
//! a round trip through `f32`, 8 bytes otherwise. Booleans are one byte,
//! times are integers (seconds since the epoch), strings are UTF-8 and
//! opaque values are copied as they are.

use lwm2m_core::{DataType, Lwm2mError, Lwm2mResult, Value};

/// Encode a value to TLV value bytes
pub fn encode_value(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.as_bytes().to_vec(),
        Value::Integer(i) | Value::Time(i) => encode_integer(*i),
        Value::Float(f) => encode_float(*f),
        Value::Boolean(b) => vec![u8::from(*b)],
        Value::Opaque(bytes) => bytes.clone(),
    }
}

/// Decode TLV value bytes as the given type
pub fn decode_value(bytes: &[u8], data_type: DataType) -> Lwm2mResult<Value> {
    match data_type {
        DataType::String => String::from_utf8(bytes.to_vec())
            .map(Value::String)
            .map_err(|e| Lwm2mError::malformed(format!("invalid UTF-8 string: {}", e))),
        DataType::Integer => decode_integer(bytes).map(Value::Integer),
        DataType::Time => decode_integer(bytes).map(Value::Time),
        DataType::Float => decode_float(bytes).map(Value::Float),
        DataType::Boolean => match bytes {
            [0] => Ok(Value::Boolean(false)),
            [1] => Ok(Value::Boolean(true)),
            _ => Err(Lwm2mError::malformed(format!("invalid boolean value: {:02X?}", bytes))),
        },
        DataType::Opaque => Ok(Value::Opaque(bytes.to_vec())),
    }
}

pub fn encode_integer(value: i64) -> Vec<u8> {
    if let Ok(v) = i8::try_from(value) {
        v.to_be_bytes().to_vec()
    } else if let Ok(v) = i16::try_from(value) {
        v.to_be_bytes().to_vec()
    } else if let Ok(v) = i32::try_from(value) {
        v.to_be_bytes().to_vec()
    } else {
        value.to_be_bytes().to_vec()
    }
}

pub fn decode_integer(bytes: &[u8]) -> Lwm2mResult<i64> {
    match bytes.len() {
        1 => Ok(i64::from(i8::from_be_bytes([bytes[0]]))),
        2 => Ok(i64::from(i16::from_be_bytes([bytes[0], bytes[1]]))),
        4 => Ok(i64::from(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))),
        8 => Ok(i64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
            bytes[4], bytes[5], bytes[6], bytes[7],
        ])),
        n => Err(Lwm2mError::malformed(format!("invalid integer length: {}", n))),
    }
}

pub fn encode_float(value: f64) -> Vec<u8> {
    let narrow = value as f32;
    if f64::from(narrow) == value {
        narrow.to_be_bytes().to_vec()
    } else {
        value.to_be_bytes().to_vec()
    }
}

pub fn decode_float(bytes: &[u8]) -> Lwm2mResult<f64> {
    match bytes.len() {
        4 => Ok(f64::from(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))),
        8 => Ok(f64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
            bytes[4], bytes[5], bytes[6], bytes[7],
        ])),
        n => Err(Lwm2mError::malformed(format!("invalid float length: {}", n))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_width_follows_magnitude() {
        assert_eq!(encode_integer(0), vec![0x00]);
        assert_eq!(encode_integer(-1), vec![0xFF]);
        assert_eq!(encode_integer(127), vec![0x7F]);
        assert_eq!(encode_integer(128), vec![0x00, 0x80]);
        assert_eq!(encode_integer(-129), vec![0xFF, 0x7F]);
        assert_eq!(encode_integer(70_000).len(), 4);
        assert_eq!(encode_integer(i64::from(i32::MAX) + 1).len(), 8);
    }

    #[test]
    fn test_integer_decode() {
        assert_eq!(decode_integer(&[0xFF, 0x7F]).unwrap(), -129);
        assert_eq!(decode_integer(&encode_integer(i64::MIN)).unwrap(), i64::MIN);
        assert!(decode_integer(&[0, 0, 0]).is_err());
        assert!(decode_integer(&[]).is_err());
    }

    #[test]
    fn test_float_width() {
        assert_eq!(encode_float(1.5).len(), 4);
        assert_eq!(encode_float(0.1).len(), 8);
        assert_eq!(decode_float(&encode_float(0.1)).unwrap(), 0.1);
        assert_eq!(decode_float(&encode_float(-2.25)).unwrap(), -2.25);
        assert!(decode_float(&[0, 0]).is_err());
    }

    #[test]
    fn test_typed_values() {
        assert_eq!(encode_value(&Value::new_bool(true)), vec![1]);
        assert_eq!(decode_value(&[0], DataType::Boolean).unwrap(), Value::Boolean(false));
        assert!(decode_value(&[2], DataType::Boolean).is_err());
        assert_eq!(decode_value(b"+02", DataType::String).unwrap(), Value::new_string("+02"));
        assert!(decode_value(&[0xFF, 0xFE], DataType::String).is_err());
        assert_eq!(
            decode_value(&encode_value(&Value::new_time(1_400_000_000)), DataType::Time).unwrap(),
            Value::Time(1_400_000_000)
        );
    }
}
