//! Last-segment and stem extraction from URL paths.

use url::Url;

/// Last non-empty path segment of `url`, or `None` for the root path.
pub fn last_path_segment(url: &Url) -> Option<&str> {
    let segment = url.path().split('/').filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment)
}

/// Splits `name` into stem and extension at the last dot.
///
/// A leading dot does not start an extension (`.hidden` has no extension).
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(i) => (&name[..i], Some(&name[i + 1..])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn last_segment() {
        assert_eq!(last_path_segment(&u("https://example.com/a/b/pic.png")), Some("pic.png"));
        assert_eq!(last_path_segment(&u("https://example.com/single")), Some("single"));
        assert_eq!(last_path_segment(&u("https://example.com/dir/")), Some("dir"));
    }

    #[test]
    fn root_has_no_segment() {
        assert_eq!(last_path_segment(&u("https://example.com/")), None);
        assert_eq!(last_path_segment(&u("https://example.com")), None);
    }

    #[test]
    fn query_is_not_part_of_segment() {
        assert_eq!(
            last_path_segment(&u("https://example.com/pic.jpg?w=200")),
            Some("pic.jpg")
        );
    }

    #[test]
    fn extension_split() {
        assert_eq!(split_extension("logo.png"), ("logo", Some("png")));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_extension("noext"), ("noext", None));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
        assert_eq!(split_extension("trailing."), ("trailing", Some("")));
    }
}
