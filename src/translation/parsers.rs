use super::scanner::{is_identifier_byte, scan_digits};

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Match `@pN` at `start`, returning the index just past the digits and `N`.
///
/// `@@p1` (a system function prefix) and `@p1x` (a longer variable name) are not
/// placeholders.
pub(super) fn try_ordinal_placeholder(bytes: &[u8], start: usize) -> Option<(usize, usize)> {
    if start > 0 && is_identifier_byte(bytes[start - 1]) {
        return None;
    }
    if !matches!(bytes.get(start + 1), Some(b'p' | b'P')) {
        return None;
    }
    let (end, digits) = scan_digits(bytes, start + 2)?;
    if bytes.get(end).is_some_and(|b| is_identifier_byte(*b)) {
        return None;
    }
    digits.parse().ok().map(|ordinal| (end, ordinal))
}
