//! Character-set validation for request parameters, rfc6749 appendix A.

/// VSCHAR: the printable ascii range `%x20-7E`.
pub(crate) fn vschar(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ('\x20'..='\x7e').contains(&ch))
}
