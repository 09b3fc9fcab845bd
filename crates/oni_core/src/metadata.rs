//! Whole-file diagnostics over every zlib segment that inflates.

use std::fmt::Write as _;

use tracing::debug;

use crate::compressed::{InflatedSegment, inflated_segments};
use crate::ksav;
use crate::model::{SaveBlockInfo, SaveGameMetadata};

const PREVIEW_LEN: usize = 10;

pub fn build(data: &[u8], body: Option<&[u8]>) -> SaveGameMetadata {
    let blocks: Vec<SaveBlockInfo> = inflated_segments(data, 0)
        .map(|segment| block_info(data, &segment))
        .collect();
    debug!(blocks = blocks.len(), "collected block diagnostics");
    SaveGameMetadata {
        blocks,
        ksav_summary: body.map(ksav::summarize).unwrap_or_default(),
    }
}

fn block_info(data: &[u8], segment: &InflatedSegment) -> SaveBlockInfo {
    let compressed = &data[segment.offset..];
    SaveBlockInfo {
        offset: segment.offset,
        header_preview: hex(&compressed[..compressed.len().min(PREVIEW_LEN)]),
        compressed_size: compressed.len(),
        decompressed_size: segment.bytes.len(),
        crc32: format!("{:08x}", crc32fast::hash(&segment.bytes)),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    use super::{build, hex};

    fn zlib(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).expect("zlib encode should write");
        encoder.finish().expect("zlib encode should finish")
    }

    #[test]
    fn records_each_segment_with_crc() {
        let first = b"hello hello hello".to_vec();
        let second = vec![7u8; 300];
        let mut data = b"prefix".to_vec();
        let first_at = data.len();
        data.extend(zlib(&first));
        data.extend_from_slice(b"gap");
        let second_at = data.len();
        data.extend(zlib(&second));

        let meta = build(&data, None);
        let offsets: Vec<usize> = meta.blocks.iter().map(|b| b.offset).collect();
        assert!(offsets.contains(&first_at));
        assert!(offsets.contains(&second_at));
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));

        let block = meta
            .blocks
            .iter()
            .find(|b| b.offset == second_at)
            .expect("second segment recorded");
        assert_eq!(block.decompressed_size, 300);
        assert_eq!(block.compressed_size, data.len() - second_at);
        assert_eq!(block.crc32, format!("{:08x}", crc32fast::hash(&second)));
        assert_eq!(block.crc32.len(), 8);
        assert_eq!(block.header_preview.len(), 20);
        assert!(block.header_preview.starts_with("789c"));
        assert_eq!(meta.ksav_summary.group_count, 0);
    }

    #[test]
    fn summary_comes_from_the_body() {
        let mut body = b"KSAV".to_vec();
        for v in [7i32, 35, 1, 4] {
            body.extend_from_slice(&v.to_le_bytes());
        }
        body.extend_from_slice(b"Tile");
        body.extend_from_slice(&9i32.to_le_bytes());
        body.extend_from_slice(&0i32.to_le_bytes());

        let meta = build(b"no segments here", Some(&body));
        assert!(meta.blocks.is_empty());
        assert_eq!(meta.ksav_summary.group_count, 1);
        assert_eq!(meta.ksav_summary.total_instances, 9);
    }

    #[test]
    fn preview_is_lowercase_hex() {
        assert_eq!(hex(&[0x78, 0xDA, 0x01]), "78da01");
        assert_eq!(hex(&[]), "");
    }
}
