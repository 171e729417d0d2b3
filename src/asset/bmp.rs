//! Minimal BMP decoder for the texture store.
//!
//! Only the format the game's assets use is accepted: 24-bit color,
//! no compression, 54-byte header. Header fields are read at fixed
//! offsets; a zero image-size or data-offset field is inferred as
//! `width * height * 3` and 54 respectively, which some exporters
//! write.

use std::fs;
use std::path::Path;

use thiserror::Error;

const HEADER_LEN: usize = 54;

#[derive(Error, Debug)]
pub enum BmpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file is shorter than the 54-byte BMP header")]
    Truncated,
    #[error("not a BMP file (missing BM magic)")]
    BadMagic,
    #[error("unsupported bit depth {0} (only 24-bit is accepted)")]
    UnsupportedDepth(u16),
    #[error("compressed BMP files are not supported")]
    Compressed,
    #[error("pixel data is shorter than the declared image size")]
    ShortPixelData,
}

/// Decoded image, rows top-down, tightly packed RGBA (alpha 255).
pub struct Bmp {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn load_bmp(path: impl AsRef<Path>) -> Result<Bmp, BmpError> {
    let path = path.as_ref();
    log::info!("Loading texture: {:?}", path);
    let bytes = fs::read(path)?;
    decode_bmp(&bytes)
}

pub fn decode_bmp(bytes: &[u8]) -> Result<Bmp, BmpError> {
    if bytes.len() < HEADER_LEN {
        return Err(BmpError::Truncated);
    }
    if bytes[0] != b'B' || bytes[1] != b'M' {
        return Err(BmpError::BadMagic);
    }

    let depth = read_u16(bytes, 0x1C);
    if depth != 24 {
        return Err(BmpError::UnsupportedDepth(depth));
    }
    if read_u32(bytes, 0x1E) != 0 {
        return Err(BmpError::Compressed);
    }

    let width = read_u32(bytes, 0x12);
    let height = read_u32(bytes, 0x16);

    // Sizes derived from header fields must not overflow or exceed the
    // pixel slice; anything out of range reads as short data.
    let tight_size = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(3))
        .ok_or(BmpError::ShortPixelData)?;

    let mut image_size = read_u32(bytes, 0x22) as usize;
    if image_size == 0 {
        image_size = tight_size;
    }
    let mut data_offset = read_u32(bytes, 0x0A) as usize;
    if data_offset == 0 {
        data_offset = HEADER_LEN;
    }

    // Rows are stored bottom-up in BGR, padded to 4-byte boundaries.
    let row_bytes = (width as usize)
        .checked_mul(3)
        .ok_or(BmpError::ShortPixelData)?;
    let row_stride = if image_size == tight_size {
        row_bytes
    } else {
        row_bytes
            .checked_add(3)
            .ok_or(BmpError::ShortPixelData)?
            & !3
    };

    // The declared image size can underreport what the row loop reads.
    let needed = (height as usize)
        .checked_mul(row_stride)
        .ok_or(BmpError::ShortPixelData)?;
    let pixels = bytes
        .get(data_offset..)
        .filter(|data| data.len() >= needed.max(image_size))
        .ok_or(BmpError::ShortPixelData)?;

    let mut rgba = Vec::with_capacity(tight_size / 3 * 4);
    for y in 0..height {
        let src_row = (height - 1 - y) as usize * row_stride;
        for x in 0..width as usize {
            let p = src_row + x * 3;
            let (b, g, r) = (pixels[p], pixels[p + 1], pixels[p + 2]);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }

    Ok(Bmp {
        width,
        height,
        rgba,
    })
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal 24-bit BMP with the given pixel rows
    /// (top-down, RGB) and optionally zeroed size/offset fields.
    pub(crate) fn encode_bmp(width: u32, height: u32, rgb: &[u8], zero_fields: bool) -> Vec<u8> {
        assert_eq!(rgb.len(), (width * height * 3) as usize);
        let row_stride = ((width * 3 + 3) & !3) as usize;
        let image_size = row_stride * height as usize;

        let mut out = vec![0u8; HEADER_LEN];
        out[0] = b'B';
        out[1] = b'M';
        out[0x1C] = 24;
        if !zero_fields {
            out[0x0A..0x0E].copy_from_slice(&(HEADER_LEN as u32).to_le_bytes());
            out[0x22..0x26].copy_from_slice(&(image_size as u32).to_le_bytes());
        }
        out[0x12..0x16].copy_from_slice(&width.to_le_bytes());
        out[0x16..0x1A].copy_from_slice(&height.to_le_bytes());

        // Bottom-up BGR rows with padding.
        for y in (0..height).rev() {
            let mut row = vec![0u8; row_stride];
            for x in 0..width as usize {
                let src = (y * width) as usize * 3 + x * 3;
                row[x * 3] = rgb[src + 2];
                row[x * 3 + 1] = rgb[src + 1];
                row[x * 3 + 2] = rgb[src];
            }
            out.extend_from_slice(&row);
        }
        out
    }

    #[test]
    fn decodes_pixels_top_down_rgba() {
        // 2x2: red, green / blue, white
        let rgb = [
            255, 0, 0, 0, 255, 0, //
            0, 0, 255, 255, 255, 255,
        ];
        let bytes = encode_bmp(2, 2, &rgb, false);
        let bmp = decode_bmp(&bytes).unwrap();
        assert_eq!((bmp.width, bmp.height), (2, 2));
        assert_eq!(&bmp.rgba[0..4], &[255, 0, 0, 255]);
        assert_eq!(&bmp.rgba[4..8], &[0, 255, 0, 255]);
        assert_eq!(&bmp.rgba[12..16], &[255, 255, 255, 255]);
    }

    #[test]
    fn zero_size_and_offset_fields_are_inferred() {
        let rgb = [10u8; 4 * 1 * 3];
        let bytes = encode_bmp(4, 1, &rgb, true);
        let bmp = decode_bmp(&bytes).unwrap();
        assert_eq!(bmp.rgba.len(), 4 * 1 * 4);
        assert_eq!(bmp.rgba[0], 10);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut bytes = encode_bmp(1, 1, &[0, 0, 0], false);
        bytes[0] = b'X';
        assert!(matches!(decode_bmp(&bytes), Err(BmpError::BadMagic)));
    }

    #[test]
    fn rejects_non_24_bit() {
        let mut bytes = encode_bmp(1, 1, &[0, 0, 0], false);
        bytes[0x1C] = 32;
        assert!(matches!(
            decode_bmp(&bytes),
            Err(BmpError::UnsupportedDepth(32))
        ));
    }

    #[test]
    fn rejects_compressed() {
        let mut bytes = encode_bmp(1, 1, &[0, 0, 0], false);
        bytes[0x1E] = 1;
        assert!(matches!(decode_bmp(&bytes), Err(BmpError::Compressed)));
    }

    #[test]
    fn rejects_truncated_pixel_data() {
        let mut bytes = encode_bmp(2, 2, &[0u8; 12], false);
        bytes.truncate(HEADER_LEN + 3);
        assert!(matches!(decode_bmp(&bytes), Err(BmpError::ShortPixelData)));
    }

    #[test]
    fn rejects_underdeclared_image_size() {
        // Declared size 13 passes the naive length check but the padded
        // rows span 16 bytes; decoding must report short data.
        let mut bytes = encode_bmp(2, 2, &[0u8; 12], false);
        bytes[0x22..0x26].copy_from_slice(&13u32.to_le_bytes());
        bytes.truncate(HEADER_LEN + 13);
        assert!(matches!(decode_bmp(&bytes), Err(BmpError::ShortPixelData)));
    }

    #[test]
    fn rejects_overflowing_dimensions() {
        let mut bytes = encode_bmp(1, 1, &[0, 0, 0], false);
        bytes[0x12..0x16].copy_from_slice(&u32::MAX.to_le_bytes());
        bytes[0x16..0x1A].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(decode_bmp(&bytes), Err(BmpError::ShortPixelData)));
    }

    #[test]
    fn rejects_short_header() {
        assert!(matches!(decode_bmp(&[0u8; 10]), Err(BmpError::Truncated)));
    }
}
