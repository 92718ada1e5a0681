//! Dotted field paths with optional indices, e.g. `outer.inner[2].leaf`.

/// One `name` or `name[index]` component of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PathSegment<'a> {
    pub(crate) name: &'a str,
    pub(crate) index: Option<usize>,
}

/// Splits a path into segments, or `None` when it is malformed.
pub(crate) fn parse(path: &str) -> Option<Vec<PathSegment<'_>>> {
    path.split('.').map(parse_segment).collect()
}

fn parse_segment(raw: &str) -> Option<PathSegment<'_>> {
    let segment = raw.trim();
    let Some(open) = segment.find('[') else {
        return (!segment.is_empty()).then_some(PathSegment {
            name: segment,
            index: None,
        });
    };
    let (name, rest) = segment.split_at(open);
    let digits = rest.strip_prefix('[')?.strip_suffix(']')?;
    let index = digits.trim().parse().ok()?;
    (!name.is_empty()).then_some(PathSegment {
        name,
        index: Some(index),
    })
}
