//! PNG encoding for RGBA raster data.
//!
//! Single encoding mode: 8-bit RGBA (color type 6). Fractal renders
//! rarely fit a 256-color palette, so there is no indexed path.

use std::io::Write;

use fractal_common::{PipelineError, PipelineResult};

use crate::fractal::Raster;

/// Encode a raster as a PNG.
pub fn encode_png(raster: &Raster) -> PipelineResult<Vec<u8>> {
    let width = raster.width as usize;
    let height = raster.height as usize;

    if raster.pixels.len() != width * height * 4 {
        return Err(PipelineError::EncodeError(format!(
            "Pixel buffer of {} bytes does not match {}x{} RGBA",
            raster.pixels.len(),
            width,
            height
        )));
    }

    let mut png = Vec::new();

    // PNG signature
    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);

    // IHDR chunk
    let mut ihdr_data = Vec::with_capacity(13);
    ihdr_data.extend_from_slice(&raster.width.to_be_bytes());
    ihdr_data.extend_from_slice(&raster.height.to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(6); // color type (RGBA)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    // IDAT chunk (image data)
    let idat_data = deflate_idat(&raster.pixels, width, height)
        .map_err(|e| PipelineError::EncodeError(format!("IDAT compression failed: {}", e)))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    // IEND chunk
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Write a PNG chunk: length, type, data, CRC.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let crc_data = [chunk_type.as_slice(), data].concat();
    let crc = crc32fast::hash(&crc_data);
    png.extend_from_slice(&crc.to_be_bytes());
}

/// Deflate RGBA scanlines for the IDAT chunk (filter type: none).
fn deflate_idat(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(height * (1 + width * 4));
    for y in 0..height {
        uncompressed.push(0); // filter type: none
        let row_start = y * width * 4;
        uncompressed.extend_from_slice(&pixels[row_start..row_start + width * 4]);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width: u32, height: u32) -> Raster {
        Raster {
            width,
            height,
            pixels: vec![128; (width * height * 4) as usize],
        }
    }

    #[test]
    fn test_png_signature_and_ihdr() {
        let png = encode_png(&raster(4, 2)).unwrap();

        assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
        // IHDR payload starts at offset 16: width then height, big-endian.
        assert_eq!(&png[16..20], &4u32.to_be_bytes());
        assert_eq!(&png[20..24], &2u32.to_be_bytes());
        assert_eq!(png[24], 8); // bit depth
        assert_eq!(png[25], 6); // RGBA
    }

    #[test]
    fn test_png_ends_with_iend() {
        let png = encode_png(&raster(2, 2)).unwrap();
        // ...length(0) + "IEND" + CRC
        let tail = &png[png.len() - 12..];
        assert_eq!(&tail[0..4], &0u32.to_be_bytes());
        assert_eq!(&tail[4..8], b"IEND");
    }

    #[test]
    fn test_mismatched_buffer_is_rejected() {
        let bad = Raster {
            width: 4,
            height: 4,
            pixels: vec![0; 7],
        };
        assert!(encode_png(&bad).is_err());
    }
}
