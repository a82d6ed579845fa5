/// One entry of the operator's desired gallery, before synchronization.
///
/// `Existing` references an object persisted by a prior save; `Pending`
/// carries raw bytes that have not been uploaded yet and therefore has no
/// storage key. A candidate never outlives one synchronization run.
#[derive(Debug, Clone)]
pub enum AssetCandidate {
    Existing {
        storage_key: String,
        caption: Option<String>,
    },
    Pending {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
        caption: Option<String>,
    },
}

impl AssetCandidate {
    pub fn caption(&self) -> Option<&str> {
        match self {
            AssetCandidate::Existing { caption, .. } => caption.as_deref(),
            AssetCandidate::Pending { caption, .. } => caption.as_deref(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AssetCandidate::Pending { .. })
    }
}
