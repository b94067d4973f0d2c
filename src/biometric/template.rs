//! Binary template format: magic, dimension, count, then little-endian f32s.

use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"CFT1";
const HEADER_LEN: usize = 12;

pub fn encode_template(embeddings: &[Vec<f32>]) -> Result<Vec<u8>> {
    let dims = embeddings
        .first()
        .map(Vec::len)
        .filter(|&d| d > 0)
        .ok_or_else(|| biometric("cannot build a template without samples"))?;
    if embeddings.iter().any(|e| e.len() != dims) {
        return Err(biometric("samples have different embedding sizes"));
    }

    let mut out = Vec::with_capacity(HEADER_LEN + embeddings.len() * dims * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(dims as u32).to_le_bytes());
    out.extend_from_slice(&(embeddings.len() as u32).to_le_bytes());
    for value in embeddings.iter().flatten() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    Ok(out)
}

pub fn decode_template(bytes: &[u8]) -> Result<Vec<Vec<f32>>> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(biometric("unrecognized template format"));
    }
    let dims = read_u32(&bytes[4..8]) as usize;
    let count = read_u32(&bytes[8..12]) as usize;
    let body = &bytes[HEADER_LEN..];
    let expected = dims.checked_mul(count).and_then(|n| n.checked_mul(4));
    if dims == 0 || expected != Some(body.len()) {
        return Err(biometric("template is truncated"));
    }

    let values: Vec<f32> = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(values.chunks(dims).map(<[f32]>::to_vec).collect())
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn biometric(message: &str) -> Error {
    Error::Biometric {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let samples = vec![vec![0.5, -1.0, 2.0], vec![0.0, 1.0, 0.25]];
        let bytes = encode_template(&samples).unwrap();
        assert_eq!(bytes.len(), 12 + 6 * 4);
        assert_eq!(decode_template(&bytes).unwrap(), samples);
    }

    #[test]
    fn test_rejects_mixed_dimensions() {
        assert!(encode_template(&[vec![1.0], vec![1.0, 2.0]]).is_err());
        assert!(encode_template(&[]).is_err());
    }

    #[test]
    fn test_rejects_truncated() {
        let mut bytes = encode_template(&[vec![1.0, 2.0]]).unwrap();
        bytes.pop();
        assert!(decode_template(&bytes).is_err());
        assert!(decode_template(b"nope").is_err());
    }

    #[test]
    fn test_rejects_oversized_header() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0; 8]);
        assert!(matches!(
            decode_template(&bytes),
            Err(Error::Biometric { ref message }) if message == "template is truncated"
        ));
    }
}
