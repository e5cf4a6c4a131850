//! 3D LUT assets and Adobe `.cube` file I/O.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{Result, TonemapError};

/// A 3D lookup table loaded from disk, e.g. the Tony McMapface LUT.
///
/// Entries are stored red-fastest, then green, then blue, matching both the
/// `.cube` layout and a `size³` 3D texture upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// Grid size per axis.
    pub size: u32,
    /// LUT entries as RGB values. Length = size³.
    pub data: Vec<[f32; 3]>,
    pub domain_min: [f32; 3],
    pub domain_max: [f32; 3],
}

impl Lut3D {
    /// Identity transform of the given size.
    pub fn identity(size: u32) -> Self {
        let scale = 1.0 / (size.max(2) - 1) as f32;
        let mut data = Vec::with_capacity((size * size * size) as usize);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push([r as f32 * scale, g as f32 * scale, b as f32 * scale]);
                }
            }
        }
        Self {
            size,
            data,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
        }
    }

    /// Parse `.cube` text. Only 3D tables are accepted.
    pub fn parse_cube(text: &str) -> Result<Self> {
        let mut size: Option<u32> = None;
        let mut domain_min = [0.0; 3];
        let mut domain_max = [1.0; 3];
        let mut data = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let Some(head) = parts.next() else {
                continue;
            };
            match head {
                "TITLE" => {}
                "LUT_1D_SIZE" => {
                    return Err(malformed(line_no, "1D LUTs are not supported"));
                }
                "LUT_3D_SIZE" => {
                    let value = parts
                        .next()
                        .and_then(|v| v.parse::<u32>().ok())
                        .ok_or_else(|| malformed(line_no, "missing LUT_3D_SIZE value"))?;
                    if !(2..=256).contains(&value) {
                        return Err(TonemapError::InvalidLutSize(value));
                    }
                    size = Some(value);
                    data.reserve((value * value * value) as usize);
                }
                "DOMAIN_MIN" => domain_min = parse_triplet(line_no, parts)?,
                "DOMAIN_MAX" => domain_max = parse_triplet(line_no, parts)?,
                _ => {
                    let first = head
                        .parse::<f32>()
                        .map_err(|_| malformed(line_no, &format!("unknown keyword {head}")))?;
                    let [g, b] = parse_pair(line_no, parts)?;
                    data.push([first, g, b]);
                }
            }
        }

        let size = size.ok_or_else(|| malformed(0, "missing LUT_3D_SIZE"))?;
        let expected = (size * size * size) as usize;
        if data.len() != expected {
            return Err(malformed(
                0,
                &format!("expected {expected} entries, found {}", data.len()),
            ));
        }

        Ok(Self {
            size,
            data,
            domain_min,
            domain_max,
        })
    }

    /// Load a 3D LUT from a `.cube` file.
    pub fn load_cube(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_cube(&text)
    }

    /// Serialize as `.cube` text.
    pub fn to_cube_string(&self) -> String {
        let mut out = String::with_capacity(self.data.len() * 32 + 64);
        let _ = writeln!(out, "LUT_3D_SIZE {}", self.size);
        let [r0, g0, b0] = self.domain_min;
        let [r1, g1, b1] = self.domain_max;
        let _ = writeln!(out, "DOMAIN_MIN {r0} {g0} {b0}");
        let _ = writeln!(out, "DOMAIN_MAX {r1} {g1} {b1}");
        for [r, g, b] in &self.data {
            let _ = writeln!(out, "{r:.6} {g:.6} {b:.6}");
        }
        out
    }

    /// Save this 3D LUT to a `.cube` file.
    pub fn save_cube(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_cube_string())?;
        Ok(())
    }

    /// RGBA texels ready for a `size³` float texture upload.
    pub fn to_rgba(&self) -> Vec<[f32; 4]> {
        self.data.iter().map(|&[r, g, b]| [r, g, b, 1.0]).collect()
    }
}

fn malformed(line: usize, reason: &str) -> TonemapError {
    TonemapError::MalformedCube {
        line,
        reason: reason.to_string(),
    }
}

fn parse_pair<'a>(line: usize, mut parts: impl Iterator<Item = &'a str>) -> Result<[f32; 2]> {
    let mut next = || {
        parts
            .next()
            .and_then(|v| v.parse::<f32>().ok())
            .ok_or_else(|| malformed(line, "expected three numbers"))
    };
    Ok([next()?, next()?])
}

fn parse_triplet<'a>(line: usize, mut parts: impl Iterator<Item = &'a str>) -> Result<[f32; 3]> {
    let first = parts
        .next()
        .and_then(|v| v.parse::<f32>().ok())
        .ok_or_else(|| malformed(line, "expected three numbers"))?;
    let [b, c] = parse_pair(line, parts)?;
    Ok([first, b, c])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identity_cube() {
        let text = Lut3D::identity(3).to_cube_string();
        let lut = Lut3D::parse_cube(&text).expect("valid cube");
        assert_eq!(lut.size, 3);
        assert_eq!(lut.data.len(), 27);
        // Red varies fastest.
        assert_eq!(lut.data[1], [0.5, 0.0, 0.0]);
        assert_eq!(lut.data[26], [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_comments_and_title_are_skipped() {
        let text = "# generated\nTITLE \"tiny\"\nLUT_3D_SIZE 2\n\
                    0 0 0\n1 0 0\n0 1 0\n1 1 0\n0 0 1\n1 0 1\n0 1 1\n1 1 1\n";
        let lut = Lut3D::parse_cube(text).expect("valid cube");
        assert_eq!(lut.size, 2);
        assert_eq!(lut.domain_max, [1.0; 3]);
    }

    #[test]
    fn test_entry_count_mismatch_is_rejected() {
        let text = "LUT_3D_SIZE 2\n0 0 0\n1 1 1\n";
        assert!(matches!(
            Lut3D::parse_cube(text),
            Err(TonemapError::MalformedCube { .. })
        ));
    }

    #[test]
    fn test_1d_luts_are_rejected() {
        assert!(Lut3D::parse_cube("LUT_1D_SIZE 4\n").is_err());
    }
}
