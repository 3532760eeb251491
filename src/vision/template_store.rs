use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use indexmap::IndexMap;

use crate::common::Size;
use crate::error::TemplateError;
use crate::vision::correlation::PreparedTemplate;

pub const DEFAULT_CAPACITY: usize = 10;

/// A decoded reference image, immutable once loaded.
#[derive(Debug)]
pub struct Template {
    path: PathBuf,
    image: RgbImage,
    prepared: PreparedTemplate,
}

impl Template {
    pub fn new(path: impl Into<PathBuf>, image: RgbImage) -> Self {
        let prepared = PreparedTemplate::new(&image);
        Self {
            path: path.into(),
            image,
            prepared,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    pub(crate) fn prepared(&self) -> &PreparedTemplate {
        &self.prepared
    }
}

/// Bounded template cache keyed by path with least-recently-used eviction.
///
/// Map order is recency order: the front entry is the next to be evicted.
pub struct TemplateStore {
    capacity: usize,
    entries: IndexMap<PathBuf, Arc<Template>>,
    decodes: u64,
}

impl TemplateStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: IndexMap::with_capacity(capacity),
            decodes: 0,
        }
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<Template>, TemplateError> {
        let path = path.as_ref();

        if let Some(template) = self.entries.shift_remove(path) {
            self.entries.insert(path.to_path_buf(), Arc::clone(&template));
            return Ok(template);
        }

        if !path.is_file() {
            return Err(TemplateError::MissingAsset(path.to_path_buf()));
        }
        let image = image::open(path)
            .map_err(|source| TemplateError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        self.decodes += 1;
        tracing::debug!(
            "Decoded template {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );

        let template = Arc::new(Template::new(path, image));
        if self.capacity == 0 {
            return Ok(template);
        }
        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                tracing::debug!("Evicted template {}", evicted.display());
            }
        }
        self.entries
            .insert(path.to_path_buf(), Arc::clone(&template));
        Ok(template)
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.entries.contains_key(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of times an image file was decoded from disk.
    pub fn decode_count(&self) -> u64 {
        self.decodes
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
