use std::io::Write;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Hash algorithms a [`crate::Resource`] can be digested with (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

/// One hasher per requested algorithm, fed through a single `io::Write` fan-out
/// so a resource is streamed through exactly once regardless of how many
/// digests are requested (spec §4.1 `hashes(algos)`).
#[derive(Clone)]
pub(crate) struct FanOutHasher {
    md5: Option<Md5>,
    sha1: Option<Sha1>,
    sha256: Option<Sha256>,
}

impl FanOutHasher {
    pub(crate) fn new(algos: &[HashAlgorithm]) -> Self {
        let mut h = FanOutHasher {
            md5: None,
            sha1: None,
            sha256: None,
        };
        for algo in algos {
            match algo {
                HashAlgorithm::Md5 => h.md5.get_or_insert_with(Md5::new),
                HashAlgorithm::Sha1 => h.sha1.get_or_insert_with(Sha1::new),
                HashAlgorithm::Sha256 => h.sha256.get_or_insert_with(Sha256::new),
            };
        }
        h
    }

    /// Finalises the digest for one of the registered algorithms without
    /// consuming the others — each inner hasher is cloned before finalising
    /// so a single fan-out pass over the resource yields every requested
    /// digest.
    pub(crate) fn finish(&self, algo: HashAlgorithm) -> String {
        match algo {
            HashAlgorithm::Md5 => hex::encode(
                self.md5.clone().expect("algorithm was registered").finalize(),
            ),
            HashAlgorithm::Sha1 => hex::encode(
                self.sha1.clone().expect("algorithm was registered").finalize(),
            ),
            HashAlgorithm::Sha256 => hex::encode(
                self.sha256
                    .clone()
                    .expect("algorithm was registered")
                    .finalize(),
            ),
        }
    }
}

impl Write for FanOutHasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(h) = self.md5.as_mut() {
            h.update(buf);
        }
        if let Some(h) = self.sha1.as_mut() {
            h.update(buf);
        }
        if let Some(h) = self.sha256.as_mut() {
            h.update(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
