/// Tree-path helpers. Paths use `/` as the separator; empty segments are
/// ignored so `"a//b"` and `"/a/b"` both descend `a` then `b`.

pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

pub fn first_segment(path: &str) -> (&str, Option<&str>) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((head, rest)) if !rest.trim_matches('/').is_empty() => (head, Some(rest)),
        Some((head, _)) => (head, None),
        None => (trimmed, None),
    }
}

pub fn join_path(base: &str, child: &str) -> String {
    if base.is_empty() {
        return child.to_string();
    }
    if child.is_empty() {
        return base.to_string();
    }
    if base.ends_with('/') {
        format!("{base}{child}")
    } else {
        format!("{base}/{child}")
    }
}
