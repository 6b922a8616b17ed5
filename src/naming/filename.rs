/// Split a file name into stem and extension (with its dot) at the last dot.
/// Leading dots belong to the stem, so `.hidden` has no extension.
pub fn split_name(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name.rfind('.') {
        Some(dot) if dot >= leading => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    }
}

/// Raw positional fragments: the trimmed stem split on `_`.
pub fn stem_fragments(name: &str) -> Vec<&str> {
    split_name(name).0.trim().split('_').collect()
}
