// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Loading a source model from disk.
//!
//! A Caffe model is stored as two files read independently:
//! - the description (`deploy.prototxt` or a JSON equivalent);
//! - the trained parameters (`*.caffemodel`, a binary `NetParameter`).
//!
//! The binary container is memory-mapped and decoded once. Only layer names
//! and blobs are taken from it; the description is authoritative for
//! everything else.

use crate::description::NetDescription;
use crate::net::{SourceNet, TrainedParameters};
use crate::{proto, ModelError, ParameterBlob};
use std::collections::BTreeMap;
use std::path::Path;

/// Loads source models.
///
/// # Example
/// ```no_run
/// use caffe_model::CaffeLoader;
/// use std::path::Path;
///
/// let net = CaffeLoader::load(
///     Path::new("deploy.prototxt"),
///     Path::new("bvlc_reference_caffenet.caffemodel"),
/// )
/// .unwrap();
/// println!("{}", net.summary());
/// ```
pub struct CaffeLoader;

impl CaffeLoader {
    /// Loads the description and attaches the trained parameters.
    pub fn load(description: &Path, weights: &Path) -> Result<SourceNet, ModelError> {
        let net = Self::load_description(description)?;
        let params = Self::load_parameters(weights)?;
        Ok(net.attach_parameters(params))
    }

    /// Loads only the description; layers carry no blobs.
    pub fn load_description(path: &Path) -> Result<SourceNet, ModelError> {
        let desc = NetDescription::from_file(path)?;
        let net = SourceNet::from_description(&desc)?;
        tracing::info!("loaded description '{}' ({} layers)", net.name, net.num_layers());
        Ok(net)
    }

    /// Memory-maps and decodes a `.caffemodel` file.
    pub fn load_parameters(path: &Path) -> Result<TrainedParameters, ModelError> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the map is read-only and dropped before this function returns.
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        let params = Self::parse_parameters(&mmap)?;
        tracing::info!(
            "decoded {} blobs ({} values) from '{}'",
            params.num_blobs(),
            params.num_values(),
            path.display()
        );
        Ok(params)
    }

    /// Decodes a binary `NetParameter`, accepting both `layer` and the
    /// legacy `layers` field.
    pub fn parse_parameters(bytes: &[u8]) -> Result<TrainedParameters, ModelError> {
        let net = proto::decode_net(bytes)?;

        let named_blobs = net
            .layer
            .into_iter()
            .map(|l| (l.name, l.blobs))
            .chain(net.layers.into_iter().map(|l| (l.name, l.blobs)));

        let mut layers = BTreeMap::new();
        for (name, blobs) in named_blobs {
            if blobs.is_empty() {
                continue;
            }
            if layers.contains_key(&name) {
                tracing::warn!("duplicate trained layer '{name}', keeping the first");
                continue;
            }
            let converted = blobs
                .into_iter()
                .enumerate()
                .map(|(i, b)| ParameterBlob::from_proto(&name, i, b))
                .collect::<Result<Vec<_>, _>>()?;
            tracing::debug!("trained layer '{name}': {} blobs", converted.len());
            layers.insert(name, converted);
        }

        Ok(TrainedParameters {
            net_name: net.name,
            layers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{BlobProto, BlobShapeProto, LayerProto, NetParameterProto, V1LayerProto};
    use crate::BlobShape;
    use prost::Message;

    #[test]
    fn test_parse_modern_and_legacy_layers() {
        let net = NetParameterProto {
            name: "mixed".into(),
            layer: vec![
                LayerProto {
                    name: "conv1".into(),
                    r#type: "Convolution".into(),
                    blobs: vec![
                        BlobProto {
                            shape: Some(BlobShapeProto { dim: vec![2, 1, 1, 1] }),
                            data: vec![1.0, 2.0],
                            ..Default::default()
                        },
                        BlobProto {
                            shape: Some(BlobShapeProto { dim: vec![2] }),
                            data: vec![0.0, 0.0],
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                LayerProto {
                    name: "relu1".into(),
                    r#type: "ReLU".into(),
                    ..Default::default()
                },
            ],
            layers: vec![V1LayerProto {
                name: "fc6".into(),
                r#type: 14,
                blobs: vec![BlobProto {
                    num: Some(1),
                    channels: Some(1),
                    height: Some(1),
                    width: Some(3),
                    data: vec![1.0, 1.0, 1.0],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        let params = CaffeLoader::parse_parameters(&net.encode_to_vec()).unwrap();
        assert_eq!(params.net_name, "mixed");
        assert_eq!(params.layers.len(), 2, "blob-less layers are skipped");
        assert_eq!(params.layers["conv1"].len(), 2);
        assert_eq!(params.layers["conv1"][0].shape, BlobShape::Dims(vec![2, 1, 1, 1]));
        assert!(params.layers["fc6"][0].shape.is_legacy());
        assert_eq!(params.num_values(), 7);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let result = CaffeLoader::parse_parameters(&[0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(ModelError::Decode(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = CaffeLoader::load_parameters(Path::new("/nonexistent/model.caffemodel"));
        assert!(matches!(result, Err(ModelError::Io(_))));
    }
}
