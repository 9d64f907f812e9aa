use std::sync::Mutex;

use crate::error::ResourceError;
use crate::hash::HashAlgorithm;
use crate::resource::Resource;

/// Anything that can resolve a `(Resource, key)` pair to a public URL and
/// content hash, uploading at most once per distinct key+content (spec §4.6
/// FileStore). Implemented by `kubeup-filestore`'s concrete file stores;
/// declared here so [`Downloadable`] doesn't need to depend upward on them.
pub trait ResourcePutter {
    /// Opaque identity of this putter instance — used to key the memo so a
    /// `Downloadable` resolved against one `FileStore` and then against a
    /// *different* one (e.g. `DryRunTarget`'s embedded store vs a live one)
    /// recomputes rather than returning a stale memo (SPEC_FULL §3).
    fn identity(&self) -> usize;

    fn put(
        &self,
        key: &str,
        resource: &dyn Resource,
        hash_algorithm: HashAlgorithm,
    ) -> Result<(String, String), ResourceError>;
}

struct Memo {
    putter_identity: usize,
    url: String,
    hash: String,
}

/// A `(resource, storage key)` pair resolved through a `FileStore` on first
/// use; subsequent resolutions against the *same* store return the memoised
/// pair without re-uploading (spec §3 Downloadable).
pub struct Downloadable {
    key: String,
    resource: Box<dyn Resource>,
    memo: Mutex<Option<Memo>>,
}

impl Downloadable {
    pub fn new(key: impl Into<String>, resource: Box<dyn Resource>) -> Self {
        Downloadable {
            key: key.into(),
            resource,
            memo: Mutex::new(None),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn resource(&self) -> &dyn Resource {
        self.resource.as_ref()
    }

    /// Resolves to `(public URL, content hash)`. Identical content under the
    /// same key and the same store uploads exactly once across repeated
    /// calls within a run.
    pub fn resolve(
        &self,
        store: &dyn ResourcePutter,
        hash_algorithm: HashAlgorithm,
    ) -> Result<(String, String), ResourceError> {
        let mut guard = self.memo.lock().expect("downloadable memo mutex poisoned");
        if let Some(memo) = guard.as_ref() {
            if memo.putter_identity == store.identity() {
                return Ok((memo.url.clone(), memo.hash.clone()));
            }
        }

        let (url, hash) = store.put(&self.key, self.resource.as_ref(), hash_algorithm)?;
        *guard = Some(Memo {
            putter_identity: store.identity(),
            url: url.clone(),
            hash: hash.clone(),
        });
        Ok((url, hash))
    }
}

impl std::fmt::Debug for Downloadable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloadable").field("key", &self.key).finish()
    }
}
