//! Typed storage keys
//!
//! Every key the proxy reads or writes is built here. Segments are
//! percent-encoded before joining, so a `:` inside an API key, user id or
//! alias can never be mistaken for the delimiter.

use std::borrow::Cow;

const DELIMITER: &str = ":";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey<'a> {
    /// `id` → target URL
    Alias(&'a str),
    /// `id:apiKey` → `key:region`
    AliasOwner(&'a str),
    /// `root:fid` → JSON button list
    Session { root: &'a str, fid: u64 },
    /// `root:firstFrame` → JSON baseline
    Baseline(&'a str),
    /// `fid:data` → identify timestamp
    IdentifyMarker(u64),
}

impl StoreKey<'_> {
    pub fn encode(&self) -> String {
        match self {
            StoreKey::Alias(id) => join(&[Cow::Borrowed(*id)]),
            StoreKey::AliasOwner(id) => join(&[Cow::Borrowed(*id), Cow::Borrowed("apiKey")]),
            StoreKey::Session { root, fid } => {
                join(&[Cow::Borrowed(*root), Cow::Owned(fid.to_string())])
            }
            StoreKey::Baseline(root) => join(&[Cow::Borrowed(*root), Cow::Borrowed("firstFrame")]),
            StoreKey::IdentifyMarker(fid) => {
                join(&[Cow::Owned(fid.to_string()), Cow::Borrowed("data")])
            }
        }
    }
}

impl std::fmt::Display for StoreKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

fn join(segments: &[Cow<'_, str>]) -> String {
    segments
        .iter()
        .map(|segment| urlencoding::encode(segment))
        .collect::<Vec<_>>()
        .join(DELIMITER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(StoreKey::Alias("AAAAAAAA").encode(), "AAAAAAAA");
        assert_eq!(StoreKey::AliasOwner("AAAAAAAA").encode(), "AAAAAAAA:apiKey");
        assert_eq!(
            StoreKey::Session {
                root: "AAAAAAAA",
                fid: 42
            }
            .encode(),
            "AAAAAAAA:42"
        );
        assert_eq!(StoreKey::Baseline("AAAAAAAA").encode(), "AAAAAAAA:firstFrame");
        assert_eq!(StoreKey::IdentifyMarker(42).encode(), "42:data");
    }

    #[test]
    fn test_delimiter_inside_segment_cannot_collide() {
        // 未编码时 "a:apiKey" 作为别名会与 AliasOwner("a") 撞车
        let sneaky = StoreKey::Alias("a:apiKey").encode();
        let owner = StoreKey::AliasOwner("a").encode();
        assert_ne!(sneaky, owner);
        assert_eq!(sneaky, "a%3AapiKey");
    }

    #[test]
    fn test_alias_alphabet_is_not_escaped() {
        assert_eq!(StoreKey::Alias("aZ09_-xY").encode(), "aZ09_-xY");
    }
}
