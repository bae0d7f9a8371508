//! The boundary input document.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input-preparation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    /// The account address could not be parsed.
    #[error("invalid account address {0:?}")]
    InvalidAddress(String),

    /// The uploaded audio payload was empty.
    #[error("empty audio payload")]
    EmptyAudio,

    /// The input document could not be encoded or decoded.
    #[error("malformed input tensor: {0}")]
    Malformed(String),
}

/// The input payload recorded at submission time:
/// `{"input_data": [[…], […]]}`.
///
/// Rows are heterogeneous — integer identifiers and floating-point features
/// coexist — so elements are kept as `serde_json::Number`, which preserves
/// u64 identifiers exactly instead of rounding them through `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTensor {
    /// The nested input rows, exactly as submitted.
    pub input_data: Vec<Vec<serde_json::Number>>,
}

impl InputTensor {
    /// Build a tensor from rows of f64 values.
    ///
    /// # Errors
    ///
    /// [`TensorError::Malformed`] if any value is NaN or infinite — JSON
    /// has no representation for them.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, TensorError> {
        let input_data = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| {
                        serde_json::Number::from_f64(v)
                            .ok_or_else(|| TensorError::Malformed(format!("non-finite value {v}")))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { input_data })
    }

    /// Serialize to the exact bytes recorded as the input artifact.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TensorError> {
        serde_json::to_vec(self).map_err(|e| TensorError::Malformed(e.to_string()))
    }

    /// Decode an input artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TensorError> {
        serde_json::from_slice(bytes).map_err(|e| TensorError::Malformed(e.to_string()))
    }

    /// Total number of elements across all rows.
    pub fn len(&self) -> usize {
        self.input_data.iter().map(Vec::len).sum()
    }

    /// Whether the tensor carries no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_the_boundary_document() {
        let json = br#"{"input_data": [[1], [0.1, 0.2]]}"#;
        let tensor = InputTensor::from_bytes(json).unwrap();
        assert_eq!(tensor.input_data.len(), 2);
        assert_eq!(tensor.len(), 3);

        let bytes = tensor.to_bytes().unwrap();
        let again = InputTensor::from_bytes(&bytes).unwrap();
        assert_eq!(tensor, again);
    }

    #[test]
    fn preserves_large_integers_exactly() {
        let json = br#"{"input_data": [[18446744073709551615], [0.5]]}"#;
        let tensor = InputTensor::from_bytes(json).unwrap();
        assert_eq!(tensor.input_data[0][0].as_u64(), Some(u64::MAX));
    }

    #[test]
    fn from_rows_rejects_non_finite() {
        assert!(InputTensor::from_rows(vec![vec![f64::NAN]]).is_err());
        assert!(InputTensor::from_rows(vec![vec![f64::INFINITY]]).is_err());
        assert!(InputTensor::from_rows(vec![vec![1.0, 0.25]]).is_ok());
    }

    #[test]
    fn rejects_garbage_documents() {
        assert!(InputTensor::from_bytes(b"not json").is_err());
        assert!(InputTensor::from_bytes(br#"{"wrong_key": []}"#).is_err());
    }

    #[test]
    fn empty_tensor_is_empty() {
        let tensor = InputTensor::from_rows(vec![]).unwrap();
        assert!(tensor.is_empty());
    }
}
