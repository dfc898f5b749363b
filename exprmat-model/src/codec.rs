//! Byte payload encoding for measurement vectors.
//!
//! Payloads are flat big-endian buffers:
//!
//! - `double`: 8 bytes (IEEE 754), `long`: 8 bytes, `int`: 4 bytes
//! - `char`: one UTF-16 code unit, 2 bytes
//! - `boolean`: 1 byte, zero is `false`
//! - `string`: UTF-8 text, each value terminated by a NUL byte
//!
//! [`DataArray`] is the decoded, tagged form of a payload.

use exprmat_core::{ExprMatError, Result};

use crate::quantitation::PrimitiveType;

/// A decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DataArray {
    Double(Vec<f64>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Boolean(Vec<bool>),
    Char(Vec<char>),
    String(Vec<String>),
}

impl DataArray {
    /// Decode `bytes` as an array of `representation`.
    pub fn decode(bytes: &[u8], representation: PrimitiveType) -> Result<Self> {
        Ok(match representation {
            PrimitiveType::Double => DataArray::Double(decode_doubles(bytes)?),
            PrimitiveType::Int => DataArray::Int(decode_ints(bytes)?),
            PrimitiveType::Long => DataArray::Long(decode_longs(bytes)?),
            PrimitiveType::Boolean => DataArray::Boolean(decode_booleans(bytes)),
            PrimitiveType::Char => DataArray::Char(decode_chars(bytes)?),
            PrimitiveType::String => DataArray::String(decode_strings(bytes)?),
        })
    }

    /// Encode back to bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            DataArray::Double(v) => encode_doubles(v),
            DataArray::Int(v) => encode_ints(v),
            DataArray::Long(v) => encode_longs(v),
            DataArray::Boolean(v) => encode_booleans(v),
            DataArray::Char(v) => encode_chars(v),
            DataArray::String(v) => encode_strings(v),
        }
    }

    pub fn representation(&self) -> PrimitiveType {
        match self {
            DataArray::Double(_) => PrimitiveType::Double,
            DataArray::Int(_) => PrimitiveType::Int,
            DataArray::Long(_) => PrimitiveType::Long,
            DataArray::Boolean(_) => PrimitiveType::Boolean,
            DataArray::Char(_) => PrimitiveType::Char,
            DataArray::String(_) => PrimitiveType::String,
        }
    }

    /// Number of decoded values.
    pub fn len(&self) -> usize {
        match self {
            DataArray::Double(v) => v.len(),
            DataArray::Int(v) => v.len(),
            DataArray::Long(v) => v.len(),
            DataArray::Boolean(v) => v.len(),
            DataArray::Char(v) => v.len(),
            DataArray::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric view of the values. Booleans become 1.0/0.0; text has no
    /// numeric view.
    pub fn to_doubles(&self) -> Option<Vec<f64>> {
        match self {
            DataArray::Double(v) => Some(v.clone()),
            DataArray::Int(v) => Some(v.iter().map(|&x| f64::from(x)).collect()),
            DataArray::Long(v) => Some(v.iter().map(|&x| x as f64).collect()),
            DataArray::Boolean(v) => Some(v.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()),
            DataArray::Char(_) | DataArray::String(_) => None,
        }
    }

    /// Number of missing values: NaN doubles. Other encodings cannot
    /// represent a missing value.
    pub fn missing_count(&self) -> usize {
        match self {
            DataArray::Double(v) => v.iter().filter(|x| x.is_nan()).count(),
            _ => 0,
        }
    }
}

fn check_width(bytes: &[u8], width: usize, what: &str) -> Result<()> {
    if bytes.len() % width != 0 {
        return Err(ExprMatError::Parse(format!(
            "{} bytes is not a whole number of {what} values ({width} bytes each)",
            bytes.len()
        )));
    }
    Ok(())
}

pub fn encode_doubles(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn decode_doubles(bytes: &[u8]) -> Result<Vec<f64>> {
    check_width(bytes, 8, "double")?;
    Ok(bytes
        .chunks_exact(8)
        .map(|c| f64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

pub fn encode_ints(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn decode_ints(bytes: &[u8]) -> Result<Vec<i32>> {
    check_width(bytes, 4, "int")?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

pub fn encode_longs(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn decode_longs(bytes: &[u8]) -> Result<Vec<i64>> {
    check_width(bytes, 8, "long")?;
    Ok(bytes
        .chunks_exact(8)
        .map(|c| i64::from_be_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

pub fn encode_booleans(values: &[bool]) -> Vec<u8> {
    values.iter().map(|&b| u8::from(b)).collect()
}

pub fn decode_booleans(bytes: &[u8]) -> Vec<bool> {
    bytes.iter().map(|&b| b != 0).collect()
}

/// Chars outside the basic multilingual plane are stored as U+FFFD.
pub fn encode_chars(values: &[char]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&c| {
            let unit = u16::try_from(u32::from(c)).unwrap_or(0xFFFD);
            unit.to_be_bytes()
        })
        .collect()
}

pub fn decode_chars(bytes: &[u8]) -> Result<Vec<char>> {
    check_width(bytes, 2, "char")?;
    bytes
        .chunks_exact(2)
        .map(|c| {
            let unit = u16::from_be_bytes([c[0], c[1]]);
            char::from_u32(u32::from(unit)).ok_or_else(|| {
                ExprMatError::Parse(format!("unpaired surrogate code unit {unit:#06x}"))
            })
        })
        .collect()
}

pub fn encode_strings<S: AsRef<str>>(values: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for v in values {
        out.extend_from_slice(v.as_ref().as_bytes());
        out.push(0);
    }
    out
}

pub fn decode_strings(bytes: &[u8]) -> Result<Vec<String>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let body = match bytes.split_last() {
        Some((0, body)) => body,
        _ => {
            return Err(ExprMatError::Parse(
                "string payload is not NUL terminated".into(),
            ))
        }
    };
    body.split(|&b| b == 0)
        .map(|s| {
            String::from_utf8(s.to_vec())
                .map_err(|e| ExprMatError::Parse(format!("invalid UTF-8 in string payload: {e}")))
        })
        .collect()
}
