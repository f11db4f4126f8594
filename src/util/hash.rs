//! Hashing utilities for plan fingerprints.

use std::path::Path;

use sha2::{Digest, Sha256};

/// A hasher for building fingerprints from multiple components.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component to the fingerprint.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0"); // Separator
        self
    }

    /// Add a list of strings. The list length is hashed too, so adjacent
    /// lists cannot trade elements.
    pub fn update_strs<S: AsRef<str>>(&mut self, items: impl IntoIterator<Item = S>) -> &mut Self {
        let mut count = 0u64;
        for s in items {
            self.update_str(s.as_ref());
            count += 1;
        }
        self.hasher.update(count.to_le_bytes());
        self
    }

    /// Add a list of paths.
    pub fn update_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> &mut Self {
        self.update_strs(paths.iter().map(|p| p.as_ref().to_string_lossy().into_owned()))
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(&mut self) -> String {
        hex::encode(std::mem::take(&mut self.hasher).finalize())
    }
}

/// First 16 characters of a fingerprint, for display.
pub fn short(fingerprint: &str) -> &str {
    fingerprint.get(..16).unwrap_or(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_empty_fingerprint() {
        assert_eq!(
            Fingerprint::new().finish(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fingerprint() {
        let fp1 = Fingerprint::new().update_str("hello").update_str("world").finish();
        let fp2 = Fingerprint::new().update_str("hello").update_str("world").finish();
        let fp3 = Fingerprint::new().update_str("hello").update_str("different").finish();

        assert_eq!(fp1, fp2);
        assert_ne!(fp1, fp3);
    }

    #[test]
    fn test_list_boundaries() {
        let a = Fingerprint::new()
            .update_strs(["a", "b"])
            .update_strs(["c"])
            .finish();
        let b = Fingerprint::new()
            .update_strs(["a"])
            .update_strs(["b", "c"])
            .finish();
        assert_ne!(a, b);
    }

    #[test]
    fn test_paths() {
        let paths = vec![PathBuf::from("src/a.cc")];
        let a = Fingerprint::new().update_paths(&paths).finish();
        let b = Fingerprint::new().update_strs(["src/a.cc"]).finish();
        assert_eq!(a, b);
    }

    #[test]
    fn test_short() {
        let fp = Fingerprint::new().finish();
        assert_eq!(short(&fp), "e3b0c44298fc1c14");
        assert_eq!(short("abc"), "abc");
    }
}
