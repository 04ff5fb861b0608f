//! The opaque tile binary container consumed by the external map viewer:
//! `encode(rows, header) -> bytes`.
//!
//! Framing: a 4-byte magic, a msgpack-encoded header value, a `u32` row
//! count, then each row msgpack-encoded and length-framed the same way
//! `store` frames scratch records.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::record::Value;

const MAGIC: &[u8; 4] = b"VTTL";

/// Encode a node's mapped tile rows into the opaque tile binary.
pub fn encode<H: Serialize>(rows: &[BTreeMap<String, Value>], header: &H) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);

    let header_bytes = rmp_serde::to_vec(header).context("[tile_codec] failed to encode tile header")?;
    out.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_bytes);

    out.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    for row in rows {
        let row_bytes = rmp_serde::to_vec(row).context("[tile_codec] failed to encode tile row")?;
        out.extend_from_slice(&(row_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&row_bytes);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Header {
        name: String,
    }

    #[test]
    fn encodes_with_magic_prefix() {
        let mut row = BTreeMap::new();
        row.insert("latitude".to_string(), Value::Number(1.0));
        let bytes = encode(&[row], &Header { name: "t".to_string() }).unwrap();
        assert_eq!(&bytes[..4], MAGIC);
    }
}
