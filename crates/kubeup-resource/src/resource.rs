use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ResourceError;
use crate::hash::{FanOutHasher, HashAlgorithm};

/// An opaque, re-openable byte source (spec §3 Resource, §4.1).
///
/// `open()` must be independently consumable: calling it twice must yield
/// two streams with identical bytes within the lifetime of one process run.
pub trait Resource: fmt::Debug + Send + Sync {
    fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError>;
}

/// A resource backed by an in-memory string (e.g. rendered PEM blocks).
#[derive(Debug, Clone)]
pub struct StringResource(Arc<str>);

impl StringResource {
    pub fn new(s: impl Into<String>) -> Self {
        StringResource(Arc::from(s.into()))
    }
}

impl Resource for StringResource {
    fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        Ok(Box::new(std::io::Cursor::new(self.0.as_bytes().to_vec())))
    }
}

/// A resource backed by an in-memory byte buffer.
#[derive(Debug, Clone)]
pub struct BytesResource(Arc<[u8]>);

impl BytesResource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        BytesResource(Arc::from(data.into()))
    }
}

impl Resource for BytesResource {
    fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        Ok(Box::new(std::io::Cursor::new(self.0.to_vec())))
    }
}

/// A resource read fresh from disk on every `open()`.
#[derive(Debug, Clone)]
pub struct FileResource {
    pub path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileResource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Resource for FileResource {
    fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        let f = std::fs::File::open(&self.path).map_err(|source| ResourceError::Open {
            path: Some(self.path.display().to_string()),
            source,
        })?;
        Ok(Box::new(f))
    }
}

/// A resource whose bytes are computed lazily by a closure, re-run on every
/// `open()` (grounded on `FuncResource` in `resources.go`; used for
/// synthetically-generated artifacts such as the kube-env YAML).
pub struct FuncResource {
    f: Arc<dyn Fn() -> Result<Vec<u8>, ResourceError> + Send + Sync>,
}

impl FuncResource {
    pub fn new(f: impl Fn() -> Result<Vec<u8>, ResourceError> + Send + Sync + 'static) -> Self {
        FuncResource { f: Arc::new(f) }
    }
}

impl fmt::Debug for FuncResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncResource").finish_non_exhaustive()
    }
}

impl Resource for FuncResource {
    fn open(&self) -> Result<Box<dyn Read + Send>, ResourceError> {
        let data = (self.f)()?;
        Ok(Box::new(std::io::Cursor::new(data)))
    }
}

const COMPARE_BUF_SIZE: usize = 8192;

/// Streams `r` through `dest`, consuming the resource exactly once.
pub fn copy_resource(dest: &mut dyn std::io::Write, r: &dyn Resource) -> Result<(), ResourceError> {
    let mut input = r.open()?;
    std::io::copy(&mut input, dest).map_err(ResourceError::Read)?;
    Ok(())
}

/// Single-algorithm digest (spec §4.1 `hash(algo)`).
pub fn hash(r: &dyn Resource, algo: HashAlgorithm) -> Result<String, ResourceError> {
    let mut hasher = FanOutHasher::new(&[algo]);
    copy_resource(&mut hasher, r)?;
    Ok(hasher.finish(algo))
}

/// Multi-algorithm digest computed in one pass over the resource (spec §4.1
/// `hashes(algos)`).
pub fn hashes(
    r: &dyn Resource,
    algos: &[HashAlgorithm],
) -> Result<Vec<(HashAlgorithm, String)>, ResourceError> {
    let mut hasher = FanOutHasher::new(algos);
    copy_resource(&mut hasher, r)?;

    let mut seen = Vec::new();
    let mut result = Vec::with_capacity(algos.len());
    for &algo in algos {
        if seen.contains(&algo) {
            continue;
        }
        seen.push(algo);
        result.push((algo, hasher.finish(algo)));
    }
    Ok(result)
}

/// Streaming bytewise equality check with fixed-size buffers; fails fast on
/// the first differing window (spec §4.1 `equals(a, b)`).
pub fn equals(a: &dyn Resource, b: &dyn Resource) -> Result<bool, ResourceError> {
    let mut ar = a.open()?;
    let mut br = b.open()?;

    let mut abuf = [0u8; COMPARE_BUF_SIZE];
    let mut bbuf = [0u8; COMPARE_BUF_SIZE];

    loop {
        let an = read_full(&mut ar, &mut abuf)?;
        let bn = read_full(&mut br, &mut bbuf)?;

        if an != bn {
            return Ok(false);
        }
        if abuf[..an] != bbuf[..bn] {
            return Ok(false);
        }
        if an < COMPARE_BUF_SIZE {
            return Ok(true);
        }
    }
}

fn read_full(r: &mut dyn Read, buf: &mut [u8]) -> Result<usize, ResourceError> {
    let mut total = 0;
    while total < buf.len() {
        let n = r.read(&mut buf[total..]).map_err(ResourceError::Read)?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

/// Fully materialises a resource as bytes — only appropriate for small
/// resources such as PEM blocks (spec §4.1 `asBytes`).
pub fn as_bytes(r: &dyn Resource) -> Result<Vec<u8>, ResourceError> {
    let mut buf = Vec::new();
    copy_resource(&mut buf, r)?;
    Ok(buf)
}

pub fn as_string(r: &dyn Resource) -> Result<String, ResourceError> {
    let bytes = as_bytes(r)?;
    String::from_utf8(bytes).map_err(|e| ResourceError::Compute(e.to_string()))
}

pub fn as_base64(r: &dyn Resource) -> Result<String, ResourceError> {
    use base64::Engine;
    Ok(base64::engine::general_purpose::STANDARD.encode(as_bytes(r)?))
}
