//! Centralized validation and helper functions.

/// Maximum number of paths accepted in one container (DOS protection)
pub const MAX_PATHS: usize = 65_536;

/// Maximum number of steps accepted on a single path (DOS protection)
pub const MAX_STEPS_PER_PATH: usize = 1 << 24;

/// True for a checksum in the form [`tile_map_checksum`] writes: 32 lowercase hex digits.
///
/// ```
/// use cgf::utils::validation::{is_valid_md5, tile_map_checksum};
///
/// assert!(is_valid_md5(&tile_map_checksum("_.0:0")));
/// assert!(!is_valid_md5("D41D8CD98F00B204E9800998ECF8427E"));
/// ```
#[must_use]
pub fn is_valid_md5(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Checksum of an encoded TileMap, as stored in `EncodedTileMapMd5Sum`
#[must_use]
pub fn tile_map_checksum(encoded: &str) -> String {
    format!("{:x}", md5::compute(encoded.as_bytes()))
}

/// Check a container's geometry against the DOS limits.
///
/// Returns an error message if a limit is exceeded, None if safe.
#[must_use]
pub fn check_geometry_limits(steps_per_path: &[usize]) -> Option<String> {
    if steps_per_path.len() > MAX_PATHS {
        return Some(format!(
            "Too many paths: {} exceeds maximum of {MAX_PATHS}",
            steps_per_path.len()
        ));
    }
    steps_per_path
        .iter()
        .position(|&n| n > MAX_STEPS_PER_PATH)
        .map(|path| {
            format!(
                "Path {path} has {} steps, exceeding maximum of {MAX_STEPS_PER_PATH}",
                steps_per_path[path]
            )
        })
}

/// Half-open range of indices; `end == None` means "to the end"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl IndexRange {
    /// Clamp against a length, returning `None` if the range is empty or out of bounds
    #[must_use]
    pub fn bounded(&self, len: usize) -> Option<std::ops::Range<usize>> {
        let end = self.end.unwrap_or(len);
        if self.start >= len || end > len || end <= self.start {
            None
        } else {
            Some(self.start..end)
        }
    }
}

/// Parse a comma-separated list of index ranges.
///
/// Each item is `a` (just `a`), `a-b` (`[a,b)`), `a-` (`a` to the end), or
/// `a+n` (`[a,a+n)`). Numbers are read in `radix`.
///
/// # Errors
///
/// Returns a message naming the offending item.
pub fn parse_index_ranges(spec: &str, radix: u32) -> Result<Vec<IndexRange>, String> {
    let parse = |s: &str| {
        usize::from_str_radix(s.trim(), radix).map_err(|e| format!("invalid option {s}: {e}"))
    };

    spec.split(',')
        .map(|item| {
            if let Some((a, b)) = item.split_once('-') {
                let start = parse(a)?;
                if b.is_empty() {
                    return Ok(IndexRange { start, end: None });
                }
                Ok(IndexRange {
                    start,
                    end: Some(parse(b)?),
                })
            } else if let Some((a, n)) = item.split_once('+') {
                let start = parse(a)?;
                if n.is_empty() {
                    return Ok(IndexRange { start, end: None });
                }
                Ok(IndexRange {
                    start,
                    end: Some(start.saturating_add(parse(n)?)),
                })
            } else {
                let start = parse(item)?;
                Ok(IndexRange {
                    start,
                    end: Some(start + 1),
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_md5() {
        assert!(is_valid_md5("6aef897c3d6ff0c78aff06ac189178dd"));
        assert!(!is_valid_md5("not-an-md5"));
        assert!(!is_valid_md5(""));
        assert!(!is_valid_md5("6aef897c3d6ff0c78aff06ac189178dg"));
        assert!(!is_valid_md5("6AEF897C3D6FF0C78AFF06AC189178DD"));
    }

    #[test]
    fn test_tile_map_checksum() {
        let sum = tile_map_checksum("_.0:0;x.1:0");
        assert!(is_valid_md5(&sum));
        assert_eq!(sum, tile_map_checksum("_.0:0;x.1:0"));
        assert_ne!(sum, tile_map_checksum("_.0:0;x.0:1"));
        // md5 of the empty string
        assert_eq!(tile_map_checksum(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_check_geometry_limits() {
        assert!(check_geometry_limits(&[35, 32, 38]).is_none());
        assert!(check_geometry_limits(&vec![1; MAX_PATHS + 1]).is_some());
        assert!(check_geometry_limits(&[1, MAX_STEPS_PER_PATH + 1]).is_some());
    }

    #[test]
    fn test_parse_index_ranges() {
        let ranges = parse_index_ranges("3,5-9,10-,2+4", 10).unwrap();
        assert_eq!(
            ranges,
            vec![
                IndexRange { start: 3, end: Some(4) },
                IndexRange { start: 5, end: Some(9) },
                IndexRange { start: 10, end: None },
                IndexRange { start: 2, end: Some(6) },
            ]
        );

        let hex = parse_index_ranges("a-1f", 16).unwrap();
        assert_eq!(hex, vec![IndexRange { start: 10, end: Some(31) }]);

        assert!(parse_index_ranges("x", 10).is_err());
        assert!(parse_index_ranges("1-2-3", 10).is_err());
    }

    #[test]
    fn test_index_range_bounded() {
        let r = IndexRange { start: 2, end: None };
        assert_eq!(r.bounded(5), Some(2..5));
        assert_eq!(r.bounded(2), None);
        let r = IndexRange { start: 1, end: Some(9) };
        assert_eq!(r.bounded(5), None);
    }
}
