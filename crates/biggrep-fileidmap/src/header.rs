//! Parses the small fixed header prefix of a `.bgi` index that locates its
//! file-id map section. Index bodies themselves are opaque to this tool;
//! only the byte ranges documented below are ever touched.
//!
//! ```text
//! offset  size  field                      present in
//! 8       1     format major version       v2.0, v2.1
//! 9       1     format minor version        v2.0, v2.1
//! 11      1     hint type                   v2.1 only
//! 16/17   4     number of files (fileids)   v2.0 @16, v2.1 @17
//! 20/21   8     fileid map offset           v2.0 @20, v2.1 @21
//! ```

use std::io::{self, Read, Seek, SeekFrom};

/// Failure modes reading a `.bgi` header.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// Underlying I/O failure.
    #[error("{0}")]
    Io(#[from] io::Error),
    /// The format version isn't one this tool knows how to locate a
    /// file-id map section in.
    #[error("index format v{major}.{minor} is not supported by this tool")]
    UnsupportedVersion {
        /// Major format version read from the header.
        major: u8,
        /// Minor format version read from the header.
        minor: u8,
    },
    /// The header's file count or map offset was zero, indicating a
    /// corrupt or incomplete index.
    #[error("index header has zero file count or map offset; index is corrupt or incomplete")]
    ZeroHeader,
}

/// The fields of a `.bgi` header needed to locate its file-id map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Major format version (`2` for every version this tool supports).
    pub format_major: u8,
    /// Minor format version (`0` or `1`).
    pub format_minor: u8,
    /// v2.1 only: the hint type byte at offset 11.
    pub hint_type: Option<u8>,
    /// Number of file-id map lines the index claims to carry.
    pub file_count: u32,
    /// Byte offset of the file-id map section.
    pub map_offset: u64,
}

fn read_u8(r: &mut impl Read) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32_le(r: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(r: &mut impl Read) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Parse the header of an already-open `.bgi` file, leaving the cursor
/// positioned at the start of the file-id map section on success.
pub fn read<F: Read + Seek>(f: &mut F) -> Result<Header, HeaderError> {
    f.seek(SeekFrom::Start(8))?;
    let format_major = read_u8(f)?;
    let format_minor = read_u8(f)?;

    let hint_type = match (format_major, format_minor) {
        (2, 0) => {
            f.seek(SeekFrom::Start(16))?;
            None
        }
        (2, 1) => {
            f.seek(SeekFrom::Current(1))?;
            let hint_type = read_u8(f)?;
            f.seek(SeekFrom::Start(17))?;
            Some(hint_type)
        }
        (major, minor) => return Err(HeaderError::UnsupportedVersion { major, minor }),
    };

    let file_count = read_u32_le(f)?;
    let map_offset = read_u64_le(f)?;

    if file_count == 0 || map_offset == 0 {
        return Err(HeaderError::ZeroHeader);
    }

    f.seek(SeekFrom::Start(map_offset))?;

    Ok(Header {
        format_major,
        format_minor,
        hint_type,
        file_count,
        map_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn v20_header(file_count: u32, map_offset: u64) -> Vec<u8> {
        let mut bytes = vec![0u8; 28];
        bytes[8] = 2;
        bytes[9] = 0;
        bytes[16..20].copy_from_slice(&file_count.to_le_bytes());
        bytes[20..28].copy_from_slice(&map_offset.to_le_bytes());
        bytes
    }

    fn v21_header(hint_type: u8, file_count: u32, map_offset: u64) -> Vec<u8> {
        let mut bytes = vec![0u8; 29];
        bytes[8] = 2;
        bytes[9] = 1;
        bytes[11] = hint_type;
        bytes[17..21].copy_from_slice(&file_count.to_le_bytes());
        bytes[21..29].copy_from_slice(&map_offset.to_le_bytes());
        bytes
    }

    #[test]
    fn parses_v2_0_header() {
        let bytes = v20_header(3, 28);
        let mut cursor = Cursor::new(bytes);
        let header = read(&mut cursor).unwrap();
        assert_eq!(header.format_minor, 0);
        assert_eq!(header.hint_type, None);
        assert_eq!(header.file_count, 3);
        assert_eq!(header.map_offset, 28);
    }

    #[test]
    fn parses_v2_1_header_with_hint_type() {
        let bytes = v21_header(7, 5, 29);
        let mut cursor = Cursor::new(bytes);
        let header = read(&mut cursor).unwrap();
        assert_eq!(header.format_minor, 1);
        assert_eq!(header.hint_type, Some(7));
        assert_eq!(header.file_count, 5);
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = vec![0u8; 28];
        bytes[8] = 3;
        bytes[9] = 0;
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            read(&mut cursor),
            Err(HeaderError::UnsupportedVersion { major: 3, minor: 0 })
        ));
    }

    #[test]
    fn rejects_zero_header() {
        let bytes = v20_header(0, 0);
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(read(&mut cursor), Err(HeaderError::ZeroHeader)));
    }
}
