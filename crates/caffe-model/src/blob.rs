// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Trained parameter blobs.

use crate::proto::BlobProto;
use crate::ModelError;
use std::fmt;

/// Semantic role of a blob within its layer, derived from blob order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlobRole {
    Weight,
    Bias,
    /// Any blob past the second (e.g. batch-norm statistics).
    Extra(usize),
}

impl BlobRole {
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Weight,
            1 => Self::Bias,
            n => Self::Extra(n),
        }
    }
}

/// Declared shape of a blob.
///
/// Old models store a fixed `(num, channels, height, width)` tuple; newer
/// ones store an explicit dimension list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobShape {
    Dims(Vec<usize>),
    Legacy {
        num: usize,
        channels: usize,
        height: usize,
        width: usize,
    },
}

impl BlobShape {
    /// Returns the dimensions as a list; legacy shapes always have four.
    pub fn dims(&self) -> Vec<usize> {
        match self {
            Self::Dims(d) => d.clone(),
            Self::Legacy {
                num,
                channels,
                height,
                width,
            } => vec![*num, *channels, *height, *width],
        }
    }

    /// Number of elements the shape declares (an empty dim list is a scalar).
    pub fn num_elements(&self) -> usize {
        self.dims().iter().product()
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }
}

impl fmt::Display for BlobShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self.dims();
        let joined: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
        if self.is_legacy() {
            write!(f, "legacy({})", joined.join(", "))
        } else {
            write!(f, "[{}]", joined.join(", "))
        }
    }
}

/// One trained parameter array of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlob {
    /// Name of the owning layer.
    pub layer: String,
    pub role: BlobRole,
    pub shape: BlobShape,
    /// Payload in Caffe's row-major order. `double_data` payloads are
    /// narrowed to `f32` when decoded.
    pub data: Vec<f32>,
}

impl ParameterBlob {
    /// Builds a blob from its decoded protobuf form.
    ///
    /// The shape is not checked against the payload here; that is the
    /// parameter converter's job.
    pub(crate) fn from_proto(layer: &str, index: usize, proto: BlobProto) -> Result<Self, ModelError> {
        let shape = match &proto.shape {
            Some(s) => {
                let dims = s
                    .dim
                    .iter()
                    .map(|&d| {
                        usize::try_from(d).map_err(|_| ModelError::InvalidLayer {
                            layer: layer.to_string(),
                            detail: format!("blob {index} has negative dimension {d}"),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                BlobShape::Dims(dims)
            }
            None => {
                let field = |v: Option<i32>, what: &str| -> Result<usize, ModelError> {
                    usize::try_from(v.unwrap_or(0)).map_err(|_| ModelError::InvalidLayer {
                        layer: layer.to_string(),
                        detail: format!("blob {index} has negative {what}"),
                    })
                };
                BlobShape::Legacy {
                    num: field(proto.num, "num")?,
                    channels: field(proto.channels, "channels")?,
                    height: field(proto.height, "height")?,
                    width: field(proto.width, "width")?,
                }
            }
        };

        let data = if proto.data.is_empty() && !proto.double_data.is_empty() {
            proto.double_data.iter().map(|&v| v as f32).collect()
        } else {
            proto.data
        };

        Ok(Self {
            layer: layer.to_string(),
            role: BlobRole::from_index(index),
            shape,
            data,
        })
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        format!("{}/{:?} {} ({} values)", self.layer, self.role, self.shape, self.data.len())
    }
}
