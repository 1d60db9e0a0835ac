// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Protobuf messages of the binary `.caffemodel` container.
//!
//! Only the fields needed to recover layer names and parameter blobs are
//! declared; prost skips everything else (layer configuration in the binary
//! is ignored in favour of the textual description).

use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub struct NetParameterProto {
    #[prost(string, tag = "1")]
    pub name: String,
    /// Legacy V1 layers.
    #[prost(message, repeated, tag = "2")]
    pub layers: Vec<V1LayerProto>,
    #[prost(string, repeated, tag = "3")]
    pub input: Vec<String>,
    #[prost(int32, repeated, tag = "4")]
    pub input_dim: Vec<i32>,
    #[prost(message, repeated, tag = "8")]
    pub input_shape: Vec<BlobShapeProto>,
    #[prost(message, repeated, tag = "100")]
    pub layer: Vec<LayerProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct LayerProto {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub r#type: String,
    #[prost(string, repeated, tag = "3")]
    pub bottom: Vec<String>,
    #[prost(string, repeated, tag = "4")]
    pub top: Vec<String>,
    #[prost(message, repeated, tag = "7")]
    pub blobs: Vec<BlobProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct V1LayerProto {
    #[prost(string, repeated, tag = "2")]
    pub bottom: Vec<String>,
    #[prost(string, repeated, tag = "3")]
    pub top: Vec<String>,
    #[prost(string, tag = "4")]
    pub name: String,
    #[prost(int32, tag = "5")]
    pub r#type: i32,
    #[prost(message, repeated, tag = "6")]
    pub blobs: Vec<BlobProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BlobProto {
    #[prost(int32, optional, tag = "1")]
    pub num: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub channels: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub height: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub width: Option<i32>,
    #[prost(float, repeated, tag = "5")]
    pub data: Vec<f32>,
    #[prost(float, repeated, tag = "6")]
    pub diff: Vec<f32>,
    #[prost(message, optional, tag = "7")]
    pub shape: Option<BlobShapeProto>,
    #[prost(double, repeated, tag = "8")]
    pub double_data: Vec<f64>,
}

#[derive(Clone, PartialEq, Message)]
pub struct BlobShapeProto {
    #[prost(int64, repeated, tag = "1")]
    pub dim: Vec<i64>,
}

/// Decodes a `NetParameter` from raw bytes.
pub fn decode_net(bytes: &[u8]) -> Result<NetParameterProto, prost::DecodeError> {
    NetParameterProto::decode(bytes)
}
