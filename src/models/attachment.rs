use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::FileId;

/// Descriptor of a file already persisted server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachedFile {
    pub file_id: FileId,
    pub display_name: String,
}

/// A locally selected file waiting to be uploaded with the next mutation.
///
/// On the wire the contents travel base64-encoded in `data`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewFile {
    pub name: String,
    pub content_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl NewFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A file attachment held in client memory during an edit or reply session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingFile {
    /// Already persisted; kept across the edit unless removed.
    Persisted(AttachedFile),
    /// Newly selected; uploaded with the next mutation.
    Local(NewFile),
}

/// Identity used to keep pending file lists duplicate-free.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileKey {
    Persisted(FileId),
    /// Local files match on name, size and a digest of their contents.
    Local { name: String, size: usize, digest: u64 },
}

impl PendingFile {
    pub fn key(&self) -> FileKey {
        match self {
            Self::Persisted(file) => FileKey::Persisted(file.file_id.clone()),
            Self::Local(file) => FileKey::Local {
                name: file.name.clone(),
                size: file.size(),
                digest: content_digest(&file.data),
            },
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Persisted(file) => &file.display_name,
            Self::Local(file) => &file.name,
        }
    }
}

fn content_digest(data: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}

impl From<AttachedFile> for PendingFile {
    fn from(file: AttachedFile) -> Self {
        Self::Persisted(file)
    }
}

impl From<NewFile> for PendingFile {
    fn from(file: NewFile) -> Self {
        Self::Local(file)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
