//! Path normalization and the containment comparator.
//!
//! Paths are slash-delimited segment lists whose first segment is normally a
//! synthetic root label. All normalization is purely string-based: no
//! filesystem access, no case folding.

pub const DEFAULT_ROOT_LABEL: &str = "root";

/// How path `a` relates to path `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRelation {
    Same,
    /// `a` is a strict prefix of `b`.
    Ancestor,
    /// `b` is a strict prefix of `a`.
    Descendant,
    Disjoint,
}

impl PathRelation {
    /// The relation seen from the other side.
    pub fn inverse(self) -> Self {
        match self {
            PathRelation::Ancestor => PathRelation::Descendant,
            PathRelation::Descendant => PathRelation::Ancestor,
            other => other,
        }
    }

    /// `a` contains `b` or is `b`.
    pub fn is_covering(self) -> bool {
        matches!(self, PathRelation::Same | PathRelation::Ancestor)
    }

    pub fn is_overlap(self) -> bool {
        matches!(self, PathRelation::Ancestor | PathRelation::Descendant)
    }
}

/// Non-empty segments of a raw path. Backslashes count as separators and
/// repeated separators collapse.
pub fn segments(raw: &str) -> impl Iterator<Item = &str> {
    raw.trim()
        .split(|c| c == '/' || c == '\\')
        .filter(|segment| !segment.is_empty())
}

/// Canonical textual form: trimmed, forward slashes, no empty segments.
pub fn normalize_path(raw: &str) -> String {
    segments(raw).collect::<Vec<_>>().join("/")
}

/// Segments with a leading root label stripped.
pub fn folder_segments<'a>(raw: &'a str, root: &str) -> Vec<&'a str> {
    let mut segs: Vec<&str> = segments(raw).collect();
    if segs.first() == Some(&root) {
        segs.remove(0);
    }
    segs
}

/// Canonical full path, always starting with the root label.
pub fn canonical_path(raw: &str, root: &str) -> String {
    let segs = folder_segments(raw, root);
    if segs.is_empty() {
        return root.to_string();
    }
    format!("{}/{}", root, segs.join("/"))
}

pub fn is_root(raw: &str, root: &str) -> bool {
    folder_segments(raw, root).is_empty()
}

/// Number of segments below the root.
pub fn depth(raw: &str, root: &str) -> usize {
    folder_segments(raw, root).len()
}

pub fn relate(a: &str, b: &str, root: &str) -> PathRelation {
    let a_segs = folder_segments(a, root);
    let b_segs = folder_segments(b, root);

    if a_segs.is_empty() || b_segs.is_empty() {
        return PathRelation::Disjoint;
    }

    let shared = a_segs.len().min(b_segs.len());
    if a_segs[..shared] != b_segs[..shared] {
        return PathRelation::Disjoint;
    }

    match a_segs.len().cmp(&b_segs.len()) {
        std::cmp::Ordering::Equal => PathRelation::Same,
        std::cmp::Ordering::Less => PathRelation::Ancestor,
        std::cmp::Ordering::Greater => PathRelation::Descendant,
    }
}

/// True when `path` is `folder` or lies beneath it.
pub fn covers(folder: &str, path: &str, root: &str) -> bool {
    relate(folder, path, root).is_covering()
}

/// Canonical parent path, `None` for the root itself.
pub fn parent_path(raw: &str, root: &str) -> Option<String> {
    let segs = folder_segments(raw, root);
    if segs.is_empty() {
        return None;
    }
    Some(canonical_path(&segs[..segs.len() - 1].join("/"), root))
}

/// Decode `$XX` hex escapes in a single segment. Malformed escapes are kept
/// literally.
pub fn decode_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            // Both bytes are ASCII, so the slice sits on char boundaries.
            if let Ok(value) = u8::from_str_radix(&segment[i + 1..i + 3], 16) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Decoded last segment, or the root label for root-only paths.
pub fn display_name(raw: &str, root: &str) -> String {
    match folder_segments(raw, root).last() {
        Some(leaf) => decode_segment(leaf),
        None => root.to_string(),
    }
}
