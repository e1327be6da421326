//! Flattened field paths
//!
//! Paths address fields through nested structure: object members join
//! with `.`, array crossings append `[]` in catalogs or a literal `[i]`
//! in validation errors. `sections[].notes.score` is a catalog path;
//! `sections[1].score` locates an error in a concrete document.

/// Path reported when the document itself has the wrong shape
pub const ROOT: &str = "$root";

/// One parsed component of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Named object member
    Field(String),

    /// Array crossing with the position elided
    AnyIndex,

    /// Array element at a literal position
    Index(usize),
}

/// Append a member name to a path prefix
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Append an elided array crossing
pub fn array(prefix: &str) -> String {
    format!("{}[]", prefix)
}

/// Append a literal array index
pub fn indexed(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}

/// Replace every literal index with an elided crossing
///
/// `sections[1].notes[0].score` becomes `sections[].notes[].score`,
/// which is the catalog spelling of the same field.
pub fn collapse_indices(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '[' {
            while matches!(chars.peek(), Some(d) if d.is_ascii_digit()) {
                chars.next();
            }
        }
    }
    out
}

/// Parse a path into its segments
pub fn segments(path: &str) -> Vec<PathSegment> {
    let mut segs = Vec::new();
    let mut name = String::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !name.is_empty() {
                    segs.push(PathSegment::Field(std::mem::take(&mut name)));
                }
            }
            '[' => {
                if !name.is_empty() {
                    segs.push(PathSegment::Field(std::mem::take(&mut name)));
                }
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    chars.next();
                    if d == ']' {
                        break;
                    }
                    digits.push(d);
                }
                match digits.parse::<usize>() {
                    Ok(index) => segs.push(PathSegment::Index(index)),
                    Err(_) => segs.push(PathSegment::AnyIndex),
                }
            }
            _ => name.push(c),
        }
    }
    if !name.is_empty() {
        segs.push(PathSegment::Field(name));
    }
    segs
}

/// Whether `path` equals `ancestor` or lies beneath it
///
/// Containment respects segment boundaries: `titles` is not within
/// `title`, but `title[0]` and `title.x` are.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    match path.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with('['),
        None => false,
    }
}
