use std::fs::File;
use std::io::prelude::*;
use std::path::Path;

use crate::nlx_error::NlxError;

/// Size in bytes of the text header at the start of every Neuralynx file.
pub const HEADER_SIZE: usize = 16384;

/// Every modern Neuralynx header begins with this line prefix.
pub const HEADER_MARKER: &str = "########";

/// Reads the text header from the start of the file at `path`.
///
/// At most [`HEADER_SIZE`] bytes are read, null padding is removed and the bytes are decoded as
/// Latin-1, which maps every byte value to a character so decoding never fails. The file is closed
/// before returning.
pub fn read_header_text<P: AsRef<Path>>(path: P, validate_marker: bool) -> Result<String, NlxError> {
    let file = File::open(path)?;
    let mut buffer = Vec::with_capacity(HEADER_SIZE);
    file.take(HEADER_SIZE as u64).read_to_end(&mut buffer)?;
    header_text_from_bytes(&buffer, validate_marker)
}

/// Decodes an in-memory header block. See [`read_header_text`].
pub fn header_text_from_bytes(bytes: &[u8], validate_marker: bool) -> Result<String, NlxError> {
    let end = bytes.len().min(HEADER_SIZE);
    let text = decode_latin1(strip_nulls(&bytes[..end]));
    if validate_marker {
        check_marker(&text)?;
    }
    Ok(text)
}

/// Fails unless the text starts with [`HEADER_MARKER`]. Old files may lack it.
pub fn check_marker(text: &str) -> Result<(), NlxError> {
    if !text.starts_with(HEADER_MARKER) {
        let start: String = text.chars().take(HEADER_MARKER.len()).collect();
        return Err(NlxError::BadHeaderMarker(start));
    }
    Ok(())
}

fn strip_nulls(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != 0).map_or(start, |p| p + 1);
    &bytes[start..end]
}

fn decode_latin1(bytes: &[u8]) -> String {
    // Latin-1 code points are exactly the byte values
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_padding() -> Result<(), NlxError> {
        let mut buf = b"######## Neuralynx Data File Header\r\n-FileType NCS\r\n".to_vec();
        buf.resize(HEADER_SIZE, 0);
        let text = header_text_from_bytes(&buf, true)?;
        assert!(text.ends_with("-FileType NCS\r\n"));
        assert!(!text.contains('\0'));
        Ok(())
    }

    #[test]
    fn decodes_high_bytes() -> Result<(), NlxError> {
        let buf = b"######## \n-DspFilterDelay_\xb5s 484\n";
        let text = header_text_from_bytes(buf, true)?;
        assert!(text.contains("-DspFilterDelay_µs 484"));
        Ok(())
    }

    #[test]
    fn ignores_bytes_past_header() -> Result<(), NlxError> {
        let mut buf = b"########\n".to_vec();
        buf.resize(HEADER_SIZE, 0);
        buf.extend_from_slice(b"sample data");
        let text = header_text_from_bytes(&buf, true)?;
        assert_eq!("########\n", text);
        Ok(())
    }

    #[test]
    fn marker_validation() {
        let buf = b"## File Name: old.ncs\n";
        match header_text_from_bytes(buf, true) {
            Err(NlxError::BadHeaderMarker(start)) => assert_eq!("## File ", start),
            other => panic!("expected bad marker, got {:?}", other),
        }
        assert!(header_text_from_bytes(buf, false).is_ok());
    }
}
