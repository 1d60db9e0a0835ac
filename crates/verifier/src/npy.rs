// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! NumPy `.npy` reader and writer for reference dumps.
//!
//! Only what the fixtures use is supported: format versions 1 to 3,
//! little-endian `f4` or `f8` payloads (the latter narrowed to `f32`), and
//! C (row-major) order.

use crate::VerifyError;
use std::path::Path;
use tensor_core::{Shape, Tensor};

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    F32,
    F64,
}

impl Element {
    fn size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

/// Reads an `.npy` file into an `f32` tensor.
pub fn read_npy(path: &Path) -> Result<Tensor, VerifyError> {
    let bytes = std::fs::read(path).map_err(|source| VerifyError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_npy(&bytes, &path.display().to_string())
}

/// Parses an in-memory `.npy` payload. `origin` names it in errors.
pub fn parse_npy(data: &[u8], origin: &str) -> Result<Tensor, VerifyError> {
    if data.len() < 10 || &data[..6] != MAGIC {
        return Err(VerifyError::npy(origin, "missing NUMPY magic"));
    }
    let major = data[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([data[8], data[9]]) as usize, 10),
        2 | 3 => {
            if data.len() < 12 {
                return Err(VerifyError::npy(origin, "truncated header length"));
            }
            (u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize, 12)
        }
        v => return Err(VerifyError::npy(origin, format!("unsupported format version {v}"))),
    };
    let data_start = header_start + header_len;
    if data.len() < data_start {
        return Err(VerifyError::npy(origin, "truncated header"));
    }
    let header = std::str::from_utf8(&data[header_start..data_start])
        .map_err(|_| VerifyError::npy(origin, "header is not valid UTF-8"))?;

    let element = parse_descr(header, origin)?;
    if dict_value(header, "fortran_order", origin)?.starts_with("True") {
        return Err(VerifyError::npy(origin, "Fortran-ordered arrays are not supported"));
    }
    let dims = parse_shape(header, origin)?;
    let shape = Shape::new(dims);

    let payload = &data[data_start..];
    let expected = shape.num_elements() * element.size();
    if payload.len() != expected {
        return Err(VerifyError::npy(
            origin,
            format!("shape {shape} needs {expected} bytes, found {}", payload.len()),
        ));
    }

    let values: Vec<f32> = match element {
        Element::F32 => payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Element::F64 => payload
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
            .collect(),
    };
    Tensor::from_vec(shape, values).map_err(|e| VerifyError::npy(origin, e.to_string()))
}

/// Encodes a tensor as a version 1.0 `<f4` `.npy` payload.
pub fn encode_npy(tensor: &Tensor) -> Vec<u8> {
    let dims = tensor.shape().dims();
    let shape = match dims {
        [] => "()".to_string(),
        [d] => format!("({d},)"),
        _ => format!(
            "({})",
            dims.iter().map(usize::to_string).collect::<Vec<_>>().join(", ")
        ),
    };
    let mut header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': {shape}, }}");
    // Pad with spaces so the payload starts on an aligned offset; the
    // header ends with a newline.
    let unpadded = MAGIC.len() + 4 + header.len() + 1;
    header.push_str(&" ".repeat((ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT));
    header.push('\n');

    let mut out = Vec::with_capacity(10 + header.len() + tensor.size_bytes());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&tensor.to_le_bytes());
    out
}

/// Writes a tensor to `path` in `.npy` format.
pub fn write_npy(path: &Path, tensor: &Tensor) -> Result<(), VerifyError> {
    std::fs::write(path, encode_npy(tensor)).map_err(|source| VerifyError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Returns the text following `'key':` in the header dictionary.
fn dict_value<'a>(header: &'a str, key: &str, origin: &str) -> Result<&'a str, VerifyError> {
    let start = header
        .find(&format!("'{key}'"))
        .or_else(|| header.find(&format!("\"{key}\"")))
        .ok_or_else(|| VerifyError::npy(origin, format!("header has no '{key}'")))?;
    let rest = &header[start + key.len() + 2..];
    let colon = rest
        .find(':')
        .ok_or_else(|| VerifyError::npy(origin, format!("no ':' after '{key}'")))?;
    Ok(rest[colon + 1..].trim_start())
}

fn parse_descr(header: &str, origin: &str) -> Result<Element, VerifyError> {
    let value = dict_value(header, "descr", origin)?;
    let quote = value
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| VerifyError::npy(origin, "descr is not a string"))?;
    let end = value[1..]
        .find(quote)
        .ok_or_else(|| VerifyError::npy(origin, "unterminated descr"))?;
    match &value[1..1 + end] {
        "<f4" => Ok(Element::F32),
        "<f8" => Ok(Element::F64),
        other => Err(VerifyError::npy(origin, format!("unsupported dtype '{other}'"))),
    }
}

fn parse_shape(header: &str, origin: &str) -> Result<Vec<usize>, VerifyError> {
    let value = dict_value(header, "shape", origin)?;
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.find(')').map(|end| &v[..end]))
        .ok_or_else(|| VerifyError::npy(origin, "shape is not a tuple"))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|e| VerifyError::npy(origin, format!("bad dimension '{s}': {e}")))
        })
        .collect()
}
