//! Quantize frames to the CC:Tweaked 16-color palette.
//!
//! Output is one line per pixel row, one lowercase hex digit per pixel, rows
//! joined with `\n`. Digit `n` names palette slot `n`, which is what the
//! client hands to `term.blit` as a background string.

use std::path::Path;

use super::{FrameRenderer, MediaError};

/// Default CC:Tweaked terminal colors, in blit order (white = `0`, black = `f`).
///
/// Clients can repaint slots with `setPaletteColour`; the server assumes the
/// defaults.
pub const CC_PALETTE: [[u8; 3]; 16] = [
    [240, 240, 240], // white
    [242, 178, 51],  // orange
    [229, 127, 216], // magenta
    [153, 178, 242], // lightBlue
    [222, 222, 108], // yellow
    [127, 204, 25],  // lime
    [242, 178, 204], // pink
    [76, 76, 76],    // gray
    [153, 153, 153], // lightGray
    [76, 153, 178],  // cyan
    [178, 102, 229], // purple
    [51, 102, 204],  // blue
    [127, 102, 76],  // brown
    [87, 166, 78],   // green
    [204, 76, 76],   // red
    [17, 17, 17],    // black
];

/// Nearest-color quantizer over binary PPM (P6) frames. No dithering.
#[derive(Debug, Clone)]
pub struct PaletteRenderer {
    palette: [[u8; 3]; 16],
}

impl Default for PaletteRenderer {
    fn default() -> Self {
        Self {
            palette: CC_PALETTE,
        }
    }
}

impl PaletteRenderer {
    pub fn with_palette(palette: [[u8; 3]; 16]) -> Self {
        Self { palette }
    }

    /// Index of the palette entry closest to `rgb`. Ties go to the lower index.
    pub fn nearest(&self, rgb: [u8; 3]) -> usize {
        let mut best = 0;
        let mut best_distance = u32::MAX;
        for (index, color) in self.palette.iter().enumerate() {
            let distance: u32 = rgb
                .iter()
                .zip(color)
                .map(|(&a, &b)| {
                    let d = a.abs_diff(b) as u32;
                    d * d
                })
                .sum();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        best
    }

    pub fn render_image(&self, image: &RgbImage) -> String {
        let mut out = String::with_capacity((image.width + 1) * image.height);
        for (row_index, row) in image.pixels.chunks(image.width.max(1)).enumerate() {
            if row_index > 0 {
                out.push('\n');
            }
            for &rgb in row {
                let digit = std::char::from_digit(self.nearest(rgb) as u32, 16).unwrap_or('f');
                out.push(digit);
            }
        }
        out
    }
}

impl FrameRenderer for PaletteRenderer {
    fn render(&self, frame: &Path) -> Result<String, MediaError> {
        let bytes = std::fs::read(frame).map_err(|e| MediaError::io(frame, e))?;
        let image = decode_ppm(&bytes).map_err(|reason| MediaError::BadFrame {
            path: frame.to_path_buf(),
            reason,
        })?;
        Ok(self.render_image(&image))
    }
}

/// A decoded frame, 8 bits per channel, row major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 3]>,
}

/// Decode a binary PPM. 16-bit samples are scaled down to 8 bits.
pub fn decode_ppm(bytes: &[u8]) -> Result<RgbImage, String> {
    let mut pos = 0;

    let magic = header_token(bytes, &mut pos).ok_or("missing magic number")?;
    if magic != b"P6" {
        return Err(format!(
            "unsupported format {:?}, expected P6",
            String::from_utf8_lossy(magic)
        ));
    }

    let mut fields = [0usize; 3];
    for (field, name) in fields.iter_mut().zip(["width", "height", "maxval"]) {
        let token = header_token(bytes, &mut pos).ok_or_else(|| format!("missing {}", name))?;
        *field = std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| format!("invalid {}", name))?;
    }
    let [width, height, maxval] = fields;
    if maxval == 0 || maxval > 65535 {
        return Err(format!("invalid maxval {}", maxval));
    }

    // Exactly one whitespace byte separates the header from the raster
    pos += 1;

    let sample_bytes = if maxval < 256 { 1 } else { 2 };
    let pixel_count = width
        .checked_mul(height)
        .ok_or("image dimensions overflow")?;
    let needed = pixel_count * 3 * sample_bytes;
    let raster = bytes
        .get(pos..pos + needed)
        .ok_or_else(|| format!("truncated raster: need {} bytes", needed))?;

    let scale = |sample: usize| -> u8 {
        if maxval == 255 {
            sample as u8
        } else {
            ((sample * 255 + maxval / 2) / maxval) as u8
        }
    };

    let pixels = raster
        .chunks_exact(3 * sample_bytes)
        .map(|px| {
            let mut rgb = [0u8; 3];
            for (channel, out) in rgb.iter_mut().enumerate() {
                let sample = if sample_bytes == 1 {
                    px[channel] as usize
                } else {
                    u16::from_be_bytes([px[channel * 2], px[channel * 2 + 1]]) as usize
                };
                *out = scale(sample);
            }
            rgb
        })
        .collect();

    Ok(RgbImage {
        width,
        height,
        pixels,
    })
}

/// Next whitespace-delimited header token, skipping `#` comments.
fn header_token<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    loop {
        while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
        if *pos < bytes.len() && bytes[*pos] == b'#' {
            while *pos < bytes.len() && bytes[*pos] != b'\n' {
                *pos += 1;
            }
            continue;
        }
        break;
    }
    let start = *pos;
    while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    (start < *pos).then(|| &bytes[start..*pos])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ppm(width: usize, height: usize, pixels: &[[u8; 3]]) -> Vec<u8> {
        let mut bytes = format!("P6\n# made by a test\n{} {}\n255\n", width, height).into_bytes();
        for px in pixels {
            bytes.extend_from_slice(px);
        }
        bytes
    }

    #[test]
    fn test_exact_palette_colors_map_to_their_digit() {
        let renderer = PaletteRenderer::default();
        for (index, color) in CC_PALETTE.iter().enumerate() {
            assert_eq!(renderer.nearest(*color), index);
        }
    }

    #[test]
    fn test_nearest_color() {
        let renderer = PaletteRenderer::default();
        assert_eq!(renderer.nearest([255, 255, 255]), 0);
        assert_eq!(renderer.nearest([0, 0, 0]), 15);
        assert_eq!(renderer.nearest([210, 70, 70]), 14);
    }

    #[test]
    fn test_render_rows() {
        let image = decode_ppm(&ppm(
            3,
            2,
            &[
                [255, 255, 255],
                [0, 0, 0],
                [204, 76, 76],
                [51, 102, 204],
                [127, 204, 25],
                [17, 17, 17],
            ],
        ))
        .unwrap();
        assert_eq!(PaletteRenderer::default().render_image(&image), "0fe\nb5f");
    }

    #[test]
    fn test_render_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out_00001.ppm");
        std::fs::write(&path, ppm(2, 1, &[[240, 240, 240], [242, 178, 51]])).unwrap();

        assert_eq!(PaletteRenderer::default().render(&path).unwrap(), "01");
    }

    #[test]
    fn test_sixteen_bit_samples() {
        let mut bytes = b"P6 1 1 65535\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xff, 0x00, 0x00, 0x00, 0x00]);
        let image = decode_ppm(&bytes).unwrap();
        assert_eq!(image.pixels, vec![[255, 0, 0]]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(decode_ppm(b"").is_err());
        assert!(decode_ppm(b"P3\n1 1\n255\n0 0 0").is_err());
        assert!(decode_ppm(b"P6\n2 2\n255\n\x00\x00\x00").is_err());
        assert!(decode_ppm(b"P6\nx 2\n255\n").is_err());
    }

    #[test]
    fn test_bad_frame_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ppm");
        std::fs::write(&path, b"garbage").unwrap();

        let err = PaletteRenderer::default().render(&path).unwrap_err();
        assert!(matches!(err, MediaError::BadFrame { .. }));
    }
}
