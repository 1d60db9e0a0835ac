// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Parameter conversion: source blobs to canonical target tensors.
//!
//! Caffe stores parameters in row-major order in both the legacy and the
//! modern encoding, so conversion never permutes data. It only settles the
//! shape:
//!
//! | Layer / role          | Legacy `(n, c, h, w)`         | Modern `dim` list            |
//! |-----------------------|-------------------------------|------------------------------|
//! | any bias              | `[count]`                     | `[count]`                    |
//! | `InnerProduct` weight | `[h, w]` when `n = c = 1`     | `[d0, d1·…·dk]`              |
//! | `Convolution` weight  | `[n, c, h, w]`                | must already be 4-D          |
//! | anything else         | `[n, c, h, w]`                | as declared                  |

use crate::TranslateError;
use caffe_model::{BlobRole, BlobShape, LayerKind, ParameterBlob};
use tensor_core::{split, Shape, Tensor};

/// Target tensor name for a layer's blob: `{layer}_w`, `{layer}_b`, or
/// `{layer}_{index}` for extra blobs.
pub fn parameter_name(layer: &str, role: BlobRole) -> String {
    match role {
        BlobRole::Weight => format!("{layer}_w"),
        BlobRole::Bias => format!("{layer}_b"),
        BlobRole::Extra(i) => format!("{layer}_{i}"),
    }
}

/// Converts one blob into its canonical target tensor.
///
/// # Errors
/// [`TranslateError::Conversion`] when the declared element count differs
/// from the payload length, or the shape cannot be canonicalized for the
/// layer kind.
pub fn convert(blob: &ParameterBlob, kind: &LayerKind) -> Result<Tensor, TranslateError> {
    let name = parameter_name(&blob.layer, blob.role);
    let fail = |detail: String| TranslateError::Conversion {
        tensor: name.clone(),
        detail,
    };

    let declared = blob.shape.num_elements();
    if declared != blob.data.len() {
        return Err(fail(format!(
            "shape {} declares {declared} values but the payload has {}",
            blob.shape,
            blob.data.len()
        )));
    }

    let dims = canonical_dims(&blob.shape, blob.role, kind).map_err(fail)?;
    Tensor::from_vec(Shape::new(dims), blob.data.clone()).map_err(|e| fail(e.to_string()))
}

fn canonical_dims(shape: &BlobShape, role: BlobRole, kind: &LayerKind) -> Result<Vec<usize>, String> {
    let dims = shape.dims();
    match (role, kind) {
        (BlobRole::Bias, _) => Ok(vec![shape.num_elements()]),
        (BlobRole::Weight, LayerKind::InnerProduct) => match shape {
            BlobShape::Legacy {
                num: 1,
                channels: 1,
                height,
                width,
            } => Ok(vec![*height, *width]),
            _ if dims.len() >= 2 => Ok(vec![dims[0], dims[1..].iter().product()]),
            _ => Err(format!("inner-product weight needs at least 2 dims, got {shape}")),
        },
        (BlobRole::Weight, LayerKind::Convolution) if dims.len() != 4 => {
            Err(format!("convolution weight must be 4-D, got {shape}"))
        }
        _ => Ok(dims),
    }
}

/// Splits a canonical tensor along axis 0 into `parts` equal slices.
///
/// # Errors
/// [`TranslateError::Conversion`] if axis 0 is not divisible by `parts`.
pub fn slice(tensor: &Tensor, parts: usize, name: &str) -> Result<Vec<Tensor>, TranslateError> {
    let fail = |detail: String| TranslateError::Conversion {
        tensor: name.to_string(),
        detail,
    };
    let leading = tensor.shape().dims().first().copied().unwrap_or(0);
    if parts == 0 || leading % parts != 0 {
        return Err(fail(format!(
            "cannot slice axis 0 of {} into {parts} equal parts",
            tensor.shape()
        )));
    }
    split(&tensor.view(), 0, &vec![leading / parts; parts]).map_err(|e| fail(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(role: BlobRole, shape: BlobShape, n: usize) -> ParameterBlob {
        ParameterBlob {
            layer: "l".into(),
            role,
            shape,
            data: (0..n).map(|i| i as f32).collect(),
        }
    }

    fn legacy(num: usize, channels: usize, height: usize, width: usize) -> BlobShape {
        BlobShape::Legacy {
            num,
            channels,
            height,
            width,
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(parameter_name("conv1", BlobRole::Weight), "conv1_w");
        assert_eq!(parameter_name("conv1", BlobRole::Bias), "conv1_b");
        assert_eq!(parameter_name("bn", BlobRole::Extra(2)), "bn_2");
    }

    #[test]
    fn test_legacy_fc_weight_and_bias() {
        let w = convert(&blob(BlobRole::Weight, legacy(1, 1, 4, 6), 24), &LayerKind::InnerProduct).unwrap();
        assert_eq!(w.shape(), &Shape::matrix(4, 6));
        assert_eq!(w.as_f32_slice()[7], 7.0);

        let b = convert(&blob(BlobRole::Bias, legacy(1, 1, 1, 4), 4), &LayerKind::InnerProduct).unwrap();
        assert_eq!(b.shape(), &Shape::vector(4));
    }

    #[test]
    fn test_legacy_and_modern_conv_agree() {
        let a = convert(&blob(BlobRole::Weight, legacy(8, 3, 5, 5), 600), &LayerKind::Convolution).unwrap();
        let b = convert(
            &blob(BlobRole::Weight, BlobShape::Dims(vec![8, 3, 5, 5]), 600),
            &LayerKind::Convolution,
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shape(), &Shape::nchw(8, 3, 5, 5));
    }

    #[test]
    fn test_modern_fc_weight_collapses_trailing_dims() {
        let w = convert(
            &blob(BlobRole::Weight, BlobShape::Dims(vec![4, 2, 3]), 24),
            &LayerKind::InnerProduct,
        )
        .unwrap();
        assert_eq!(w.shape(), &Shape::matrix(4, 6));
    }

    #[test]
    fn test_count_mismatch_is_conversion_error() {
        let err = convert(&blob(BlobRole::Weight, legacy(2, 2, 1, 1), 3), &LayerKind::Convolution).unwrap_err();
        match err {
            TranslateError::Conversion { tensor, detail } => {
                assert_eq!(tensor, "l_w");
                assert!(detail.contains("declares 4"));
            }
            other => panic!("unexpected error {other}"),
        }

        // Non-empty shape with no payload at all.
        assert!(convert(&blob(BlobRole::Bias, BlobShape::Dims(vec![3]), 0), &LayerKind::Convolution).is_err());
    }

    #[test]
    fn test_conv_weight_rank_checked() {
        let err = convert(
            &blob(BlobRole::Weight, BlobShape::Dims(vec![4, 9]), 36),
            &LayerKind::Convolution,
        );
        assert!(matches!(err, Err(TranslateError::Conversion { .. })));
    }

    #[test]
    fn test_slice_axis0() {
        let t = Tensor::from_vec(Shape::matrix(4, 2), (0..8).map(|i| i as f32).collect()).unwrap();
        let parts = slice(&t, 2, "w").unwrap();
        assert_eq!(parts[0].shape(), &Shape::matrix(2, 2));
        assert_eq!(parts[1].as_f32_slice(), &[4.0, 5.0, 6.0, 7.0]);

        assert!(slice(&t, 3, "w").is_err());
    }
}
