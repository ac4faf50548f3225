//! Snapshot lookup by server name

use cloudbot_cloud::ImageRecord;
use std::collections::HashMap;

/// `server name → snapshot` lookup
///
/// When several snapshots share a server name the newest `created_at`
/// wins, then the highest id. Snapshots without a timestamp lose to any
/// timestamped one.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCatalog {
    by_name: HashMap<String, ImageRecord>,
}

impl SnapshotCatalog {
    pub fn from_images(images: impl IntoIterator<Item = ImageRecord>) -> Self {
        let mut by_name: HashMap<String, ImageRecord> = HashMap::new();
        for image in images {
            let name = image.server_name().to_string();
            match by_name.get(&name) {
                Some(current) if !is_newer(&image, current) => {}
                _ => {
                    by_name.insert(name, image);
                }
            }
        }
        Self { by_name }
    }

    pub fn get(&self, server_name: &str) -> Option<&ImageRecord> {
        self.by_name.get(server_name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn is_newer(candidate: &ImageRecord, current: &ImageRecord) -> bool {
    (candidate.created_at, candidate.id) > (current.created_at, current.id)
}
