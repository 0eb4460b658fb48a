//! Public identifiers: a short random ID plus the alias extension

use std::fmt;

/// A public ID as requested by a client, e.g. `qwerty.png`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicId<'a> {
    /// The random part, e.g. `qwerty`
    pub id: &'a str,
    /// The extension including its leading dot, or empty
    pub extension: &'a str,
}

impl<'a> PublicId<'a> {
    /// Split off the trailing extension (everything from the last `.`)
    pub fn parse(public_id: &'a str) -> Self {
        match public_id.rfind('.') {
            Some(pos) => PublicId {
                id: &public_id[..pos],
                extension: &public_id[pos..],
            },
            None => PublicId {
                id: public_id,
                extension: "",
            },
        }
    }
}

impl fmt::Display for PublicId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.id, self.extension)
    }
}

/// Extension of a file name including the leading dot, or empty
pub fn extension_of(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(pos) => &base[pos..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_extension() {
        let p = PublicId::parse("abcdef.png");
        assert_eq!(p.id, "abcdef");
        assert_eq!(p.extension, ".png");
        assert_eq!(p.to_string(), "abcdef.png");
    }

    #[test]
    fn test_parse_uses_last_dot() {
        let p = PublicId::parse("abcdef.tar.gz");
        assert_eq!(p.id, "abcdef.tar");
        assert_eq!(p.extension, ".gz");
    }

    #[test]
    fn test_parse_without_extension() {
        let p = PublicId::parse("abcdef");
        assert_eq!(p.id, "abcdef");
        assert_eq!(p.extension, "");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.JPG"), ".JPG");
        assert_eq!(extension_of("dir.d/README"), "");
        assert_eq!(extension_of("C:\\stuff\\a.txt"), ".txt");
        assert_eq!(extension_of(""), "");
    }
}
