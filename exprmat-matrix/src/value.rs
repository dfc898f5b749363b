//! Cell value types of the dense matrix variants.
//!
//! Doubles mark missing cells with NaN; the other variants wrap their value in
//! `Option` and use `None`.

use core::fmt::Debug;

use exprmat_core::{ExprMatError, Result};
use exprmat_model::codec::{encode_booleans, encode_chars, encode_doubles, encode_ints, encode_strings};
use exprmat_model::{DataArray, PrimitiveType};

/// A value storable in a dense bulk matrix.
pub trait CellValue: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Name used in summaries and error messages.
    const TYPE_NAME: &'static str;

    /// Fill for cells no vector provides.
    fn missing() -> Self;

    fn is_missing(&self) -> bool;

    /// Whether payloads of `representation` decode into this type.
    fn accepts(representation: PrimitiveType) -> bool;

    /// Convert a decoded payload.
    fn from_array(array: DataArray) -> Result<Vec<Self>>;

    /// Encode values as a payload of `representation`.
    fn encode(values: &[Self], representation: PrimitiveType) -> Result<Vec<u8>>;
}

fn mismatch(expected: &str, found: PrimitiveType) -> ExprMatError {
    ExprMatError::TypeMismatch {
        expected: expected.into(),
        found: found.to_string(),
    }
}

fn unwrap_present<T: Clone>(values: &[Option<T>]) -> Result<Vec<T>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.clone().ok_or_else(|| {
                ExprMatError::InvalidInput(format!("missing value at position {i} cannot be encoded"))
            })
        })
        .collect()
}

impl CellValue for f64 {
    const TYPE_NAME: &'static str = "double";

    fn missing() -> Self {
        f64::NAN
    }

    fn is_missing(&self) -> bool {
        self.is_nan()
    }

    fn accepts(representation: PrimitiveType) -> bool {
        representation == PrimitiveType::Double
    }

    fn from_array(array: DataArray) -> Result<Vec<Self>> {
        match array {
            DataArray::Double(v) => Ok(v),
            other => Err(mismatch(Self::TYPE_NAME, other.representation())),
        }
    }

    fn encode(values: &[Self], representation: PrimitiveType) -> Result<Vec<u8>> {
        if !Self::accepts(representation) {
            return Err(mismatch(Self::TYPE_NAME, representation));
        }
        Ok(encode_doubles(values))
    }
}

impl CellValue for Option<i32> {
    const TYPE_NAME: &'static str = "int";

    fn missing() -> Self {
        None
    }

    fn is_missing(&self) -> bool {
        self.is_none()
    }

    fn accepts(representation: PrimitiveType) -> bool {
        representation == PrimitiveType::Int
    }

    fn from_array(array: DataArray) -> Result<Vec<Self>> {
        match array {
            DataArray::Int(v) => Ok(v.into_iter().map(Some).collect()),
            other => Err(mismatch(Self::TYPE_NAME, other.representation())),
        }
    }

    fn encode(values: &[Self], representation: PrimitiveType) -> Result<Vec<u8>> {
        if !Self::accepts(representation) {
            return Err(mismatch(Self::TYPE_NAME, representation));
        }
        Ok(encode_ints(&unwrap_present(values)?))
    }
}

impl CellValue for Option<String> {
    const TYPE_NAME: &'static str = "string";

    fn missing() -> Self {
        None
    }

    fn is_missing(&self) -> bool {
        self.is_none()
    }

    fn accepts(representation: PrimitiveType) -> bool {
        representation == PrimitiveType::String
    }

    fn from_array(array: DataArray) -> Result<Vec<Self>> {
        match array {
            DataArray::String(v) => Ok(v.into_iter().map(Some).collect()),
            other => Err(mismatch(Self::TYPE_NAME, other.representation())),
        }
    }

    fn encode(values: &[Self], representation: PrimitiveType) -> Result<Vec<u8>> {
        if !Self::accepts(representation) {
            return Err(mismatch(Self::TYPE_NAME, representation));
        }
        Ok(encode_strings(&unwrap_present(values)?))
    }
}

/// Interpret a legacy present/absent call code.
///
/// `'P'` is present. `'M'` (marginal), `'A'` (absent) and every unrecognised
/// code read as not present, so an unknown code is indistinguishable from an
/// absent call.
pub fn present_absent_call(code: char) -> bool {
    code == 'P'
}

impl CellValue for Option<bool> {
    const TYPE_NAME: &'static str = "boolean";

    fn missing() -> Self {
        None
    }

    fn is_missing(&self) -> bool {
        self.is_none()
    }

    fn accepts(representation: PrimitiveType) -> bool {
        matches!(
            representation,
            PrimitiveType::Boolean | PrimitiveType::Char | PrimitiveType::String
        )
    }

    fn from_array(array: DataArray) -> Result<Vec<Self>> {
        match array {
            DataArray::Boolean(v) => Ok(v.into_iter().map(Some).collect()),
            DataArray::Char(v) => Ok(v.into_iter().map(|c| Some(present_absent_call(c))).collect()),
            DataArray::String(v) => Ok(v
                .iter()
                .map(|s| Some(s.chars().next().map_or(false, present_absent_call)))
                .collect()),
            other => Err(mismatch(Self::TYPE_NAME, other.representation())),
        }
    }

    fn encode(values: &[Self], representation: PrimitiveType) -> Result<Vec<u8>> {
        let present = unwrap_present(values)?;
        match representation {
            PrimitiveType::Boolean => Ok(encode_booleans(&present)),
            PrimitiveType::Char => {
                let codes: Vec<char> = present.iter().map(|&p| if p { 'P' } else { 'A' }).collect();
                Ok(encode_chars(&codes))
            }
            PrimitiveType::String => {
                let codes: Vec<&str> = present.iter().map(|&p| if p { "P" } else { "A" }).collect();
                Ok(encode_strings(&codes))
            }
            other => Err(mismatch(Self::TYPE_NAME, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_missing_is_nan() {
        assert!(f64::missing().is_nan());
        assert!(f64::NAN.is_missing());
        assert!(!1.0f64.is_missing());
    }

    #[test]
    fn test_int_rejects_double_payload() {
        let err = <Option<i32>>::from_array(DataArray::Double(vec![1.0])).unwrap_err();
        assert!(matches!(err, ExprMatError::TypeMismatch { .. }));
        assert!(!<Option<i32>>::accepts(PrimitiveType::Double));
    }

    #[test]
    fn test_int_missing_cannot_be_encoded() {
        assert!(<Option<i32>>::encode(&[Some(1), None], PrimitiveType::Int).is_err());
        assert_eq!(
            <Option<i32>>::encode(&[Some(1)], PrimitiveType::Int).unwrap(),
            vec![0, 0, 0, 1]
        );
    }

    #[test]
    fn test_present_absent_codes() {
        let calls = <Option<bool>>::from_array(DataArray::Char(vec!['P', 'M', 'A'])).unwrap();
        assert_eq!(calls, vec![Some(true), Some(false), Some(false)]);
    }

    /// Unrecognised call codes collapse into "not present". This is lossy:
    /// a lowercase 'p' or a '?' is reported the same as an absent call.
    #[test]
    fn test_unknown_call_codes_read_as_absent() {
        let calls = <Option<bool>>::from_array(DataArray::Char(vec!['p', '?', 'X'])).unwrap();
        assert_eq!(calls, vec![Some(false), Some(false), Some(false)]);
    }

    #[test]
    fn test_present_absent_strings() {
        let calls = <Option<bool>>::from_array(DataArray::String(vec![
            "P".into(),
            "Absent".into(),
            "".into(),
        ]))
        .unwrap();
        assert_eq!(calls, vec![Some(true), Some(false), Some(false)]);
    }

    #[test]
    fn test_boolean_encoding_follows_representation() {
        let vals = [Some(true), Some(false)];
        assert_eq!(<Option<bool>>::encode(&vals, PrimitiveType::Boolean).unwrap(), vec![1, 0]);
        assert_eq!(
            <Option<bool>>::encode(&vals, PrimitiveType::String).unwrap(),
            b"P\0A\0".to_vec()
        );
        assert!(<Option<bool>>::encode(&vals, PrimitiveType::Double).is_err());
    }
}
