//! Donor suffix handling
//!
//! Donor content often carries a short hash on part names and slot types
//! (`Camso_engine_structure_ec8ba`). Structural matching compares
//! identifiers with that fragment stripped.

const MIN_SUFFIX_LEN: usize = 4;
const MAX_SUFFIX_LEN: usize = 8;

/// Split a trailing donor suffix off an identifier.
///
/// A suffix is a final `_`-separated fragment of 4 to 8 ASCII alphanumerics
/// containing at least one digit, so plain words such as `_engine` or
/// `_mounts` are never taken for one.
///
/// ```
/// use slot_kernel::suffix::split_suffix;
///
/// assert_eq!(split_suffix("Camso_engine_structure_ec8ba"), ("Camso_engine_structure", Some("ec8ba")));
/// assert_eq!(split_suffix("Camso_engine_mesh"), ("Camso_engine_mesh", None));
/// ```
#[must_use]
pub fn split_suffix(identifier: &str) -> (&str, Option<&str>) {
    match identifier.rsplit_once('_') {
        Some((base, tail)) if !base.is_empty() && is_suffix_fragment(tail) => (base, Some(tail)),
        _ => (identifier, None),
    }
}

/// Identifier with any donor suffix removed
#[inline]
#[must_use]
pub fn strip_suffix(identifier: &str) -> &str {
    split_suffix(identifier).0
}

/// Append `suffix` to `base` unless it already carries it
#[must_use]
pub fn apply_suffix(base: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(s) if !s.is_empty() => {
            if split_suffix(base).1.is_some_and(|existing| existing.eq_ignore_ascii_case(s)) {
                base.to_string()
            } else {
                format!("{}_{s}", strip_suffix(base))
            }
        }
        _ => base.to_string(),
    }
}

/// Case-insensitive, suffix-agnostic identifier comparison
#[must_use]
pub fn matches_base(identifier: &str, base: &str) -> bool {
    strip_suffix(identifier).eq_ignore_ascii_case(strip_suffix(base))
}

/// Whether `identifier` ends with exactly `suffix`
#[must_use]
pub fn has_suffix(identifier: &str, suffix: &str) -> bool {
    split_suffix(identifier)
        .1
        .is_some_and(|s| s.eq_ignore_ascii_case(suffix))
}

fn is_suffix_fragment(fragment: &str) -> bool {
    (MIN_SUFFIX_LEN..=MAX_SUFFIX_LEN).contains(&fragment.len())
        && fragment.bytes().all(|b| b.is_ascii_alphanumeric())
        && fragment.bytes().any(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_not_suffixes() {
        assert_eq!(split_suffix("vehicleX_engine"), ("vehicleX_engine", None));
        assert_eq!(split_suffix("etk_enginemounts"), ("etk_enginemounts", None));
        assert_eq!(split_suffix("nosuffix"), ("nosuffix", None));
    }

    #[test]
    fn length_bounds() {
        assert_eq!(split_suffix("part_a1b"), ("part_a1b", None));
        assert_eq!(split_suffix("part_a1b2"), ("part", Some("a1b2")));
        assert_eq!(split_suffix("part_a1b2c3d4"), ("part", Some("a1b2c3d4")));
        assert_eq!(split_suffix("part_a1b2c3d4e"), ("part_a1b2c3d4e", None));
    }

    #[test]
    fn leading_fragment_is_not_suffix() {
        assert_eq!(split_suffix("_ec8ba"), ("_ec8ba", None));
    }

    #[test]
    fn apply_is_idempotent() {
        assert_eq!(apply_suffix("Camso_engine_mesh", Some("ec8ba")), "Camso_engine_mesh_ec8ba");
        assert_eq!(apply_suffix("Camso_engine_mesh_ec8ba", Some("ec8ba")), "Camso_engine_mesh_ec8ba");
        assert_eq!(apply_suffix("Camso_engine_mesh_ff001", Some("ec8ba")), "Camso_engine_mesh_ec8ba");
        assert_eq!(apply_suffix("Camso_engine_mesh", None), "Camso_engine_mesh");
    }

    #[test]
    fn base_matching_ignores_case_and_suffix() {
        assert!(matches_base("Camso_engine_mesh_ec8ba", "camso_engine_mesh"));
        assert!(matches_base("Camso_Engine", "Camso_Engine_ab12"));
        assert!(!matches_base("Camso_engine_mesh", "Camso_engine"));
    }

    #[test]
    fn suffix_membership() {
        assert!(has_suffix("Camso_engine_mesh_EC8BA", "ec8ba"));
        assert!(!has_suffix("Camso_engine_mesh", "ec8ba"));
    }
}
