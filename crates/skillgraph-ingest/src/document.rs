//! Decoded input documents.

use std::path::Path;

/// One document's plain text plus its identity for logs and errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub text: String,
    /// BLAKE3 hex digest of `text`.
    pub fingerprint: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = blake3::hash(text.as_bytes()).to_hex().to_string();
        Self {
            name: name.into(),
            text,
            fingerprint,
        }
    }

    /// Decode bytes as UTF-8, replacing invalid sequences.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(name, String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a text file; the document is named after the file.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, &bytes))
    }

    /// Length in characters.
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }

    /// Short fingerprint for log lines.
    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..12.min(self.fingerprint.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fingerprint_tracks_content() {
        let a = Document::new("a.txt", "Sarah Chen knows React.");
        let b = Document::new("b.txt", "Sarah Chen knows React.");
        let c = Document::new("a.txt", "Sarah Chen knows Rust.");
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
        assert_eq!(a.fingerprint.len(), 64);
        assert_eq!(a.short_fingerprint().len(), 12);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let doc = Document::from_bytes("bad.txt", b"caf\xff ok");
        assert_eq!(doc.text, "caf\u{fffd} ok");
        assert_eq!(doc.text_length(), 6);
    }

    #[tokio::test]
    async fn read_names_document_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status-report.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Omar Haddad leads Atlas.").unwrap();

        let doc = Document::read(&path).await.unwrap();
        assert_eq!(doc.name, "status-report.txt");
        assert_eq!(doc.text, "Omar Haddad leads Atlas.\n");
    }
}
