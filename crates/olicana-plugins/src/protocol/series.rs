//! Binary series frames.
//!
//! A series travels as a header record followed by `8 * n` raw bytes holding
//! `n` little-endian IEEE-754 doubles. With [`Storage::Interleaved`] the
//! values alternate x, y, so `n` is always even.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Width of one encoded value in bytes.
pub(crate) const VALUE_BYTES: usize = size_of::<f64>();

/// Layout of the values inside a binary frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    /// Alternating x, y pairs.
    #[default]
    Interleaved,
    /// Contiguous runs per axis. Recognised on the wire but not produced by
    /// any plugin in this workspace.
    Arrays,
}

/// A flat, ordered sequence of `f64` values with its declared layout.
#[derive(Debug, Clone, PartialEq)]
pub struct BinarySeries {
    storage: Storage,
    values: Vec<f64>,
}

impl BinarySeries {
    /// Creates a series, checking that interleaved data holds whole pairs.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::OddInterleavedSeries`] when `storage` is
    /// interleaved and `values` has odd length.
    pub fn new(storage: Storage, values: Vec<f64>) -> Result<Self, TransportError> {
        if storage == Storage::Interleaved && !values.len().is_multiple_of(2) {
            return Err(TransportError::OddInterleavedSeries {
                count: values.len(),
            });
        }
        Ok(Self { storage, values })
    }

    /// Builds an interleaved series from `(x, y)` points.
    #[must_use]
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let values = points.into_iter().flat_map(|(x, y)| [x, y]).collect();
        Self {
            storage: Storage::Interleaved,
            values,
        }
    }

    /// Returns the declared layout.
    #[must_use]
    pub const fn storage(&self) -> Storage {
        self.storage
    }

    /// Returns the raw values in wire order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the `(x, y)` pairs of an interleaved series.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values.chunks_exact(2).filter_map(|pair| match pair {
            [x, y] => Some((*x, *y)),
            _ => None,
        })
    }

    /// Returns the payload size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.values.len().saturating_mul(VALUE_BYTES)
    }

    pub(crate) fn header(&self) -> BinaryHeader {
        BinaryHeader {
            kind: FrameKind::Binary,
            length: self.byte_len(),
            storage: self.storage,
        }
    }

    #[expect(
        clippy::little_endian_bytes,
        reason = "the wire format is defined as little-endian"
    )]
    pub(crate) fn to_le_bytes(&self) -> Vec<u8> {
        self.values
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect()
    }

    #[expect(
        clippy::little_endian_bytes,
        reason = "the wire format is defined as little-endian"
    )]
    pub(crate) fn from_le_bytes(storage: Storage, bytes: &[u8]) -> Option<Self> {
        if !bytes.len().is_multiple_of(VALUE_BYTES) {
            return None;
        }
        let values = bytes
            .chunks_exact(VALUE_BYTES)
            .map(|chunk| <[u8; VALUE_BYTES]>::try_from(chunk).map(f64::from_le_bytes))
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        Self::new(storage, values).ok()
    }
}

/// Header record announcing a binary payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BinaryHeader {
    #[serde(rename = "type")]
    kind: FrameKind,
    length: usize,
    #[serde(default)]
    storage: Storage,
}

impl BinaryHeader {
    pub(crate) const fn length(&self) -> usize {
        self.length
    }

    pub(crate) const fn storage(&self) -> Storage {
        self.storage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FrameKind {
    Binary,
}
