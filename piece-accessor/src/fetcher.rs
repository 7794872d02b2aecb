use std::convert::TryFrom;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::time::Duration;

use log::{debug, info, trace};
use reqwest::{blocking::Client, Proxy, StatusCode};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::settings::RemoteStoreConfig;
use crate::types::PieceCid;

const READ_CHUNK_SIZE: usize = 1 << 16;
/// Upper bound on the buffer reserved up front from an advertised `Content-Length`.
const MAX_PREALLOCATION: u64 = 16 * READ_CHUNK_SIZE as u64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads piece archives from the remote store.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    config: RemoteStoreConfig,
    client: Client,
}

impl ArchiveFetcher {
    pub fn new(config: RemoteStoreConfig) -> Result<Self> {
        let client = Client::builder()
            .proxy(Proxy::custom(move |url| env_proxy::for_url(url).to_url()))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|source| Error::Transport {
                url: config.endpoint().to_string(),
                source,
            })?;

        Ok(ArchiveFetcher { config, client })
    }

    pub fn config(&self) -> &RemoteStoreConfig {
        &self.config
    }

    /// Fetches the whole archive of `piece_cid` into memory.
    ///
    /// The response is dropped before returning on every path, so its connection goes
    /// back to the pool. Cancellation is checked before the request and between body chunks;
    /// a store that stalls while sending headers or inside a chunk is only cut off by the
    /// configured request timeout, and never if none is set.
    pub fn fetch(&self, piece_cid: &PieceCid, cancel: &CancelToken) -> Result<ArchiveReader> {
        let url = self.config.archive_url(piece_cid);
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        trace!("fetching archive: GET {}", url);
        let mut resp = self
            .client
            .get(&url)
            .send()
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;
        trace!("received GET response {} for {}", resp.status(), url);

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(Error::NotFound(url)),
            StatusCode::UNAUTHORIZED => return Err(Error::PermissionDenied(url)),
            status => {
                return Err(Error::FetchFailed {
                    url,
                    status: status.as_u16(),
                })
            }
        }

        // The advertised length is only a hint; the body grows as it actually arrives.
        let capacity = resp.content_length().map_or(0, |len| len.min(MAX_PREALLOCATION));
        let mut body = Vec::with_capacity(capacity as usize);
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            if cancel.is_cancelled() {
                debug!("archive download of {} cancelled after {} bytes", url, body.len());
                return Err(Error::Cancelled);
            }
            match resp.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => body.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(Error::Io {
                        context: format!("failed to read response body of {}", url),
                        source: e,
                    })
                }
            }
        }
        drop(resp);

        info!("fetched archive {} ({} bytes)", url, body.len());
        Ok(ArchiveReader::new(body))
    }
}

/// An in-memory archive: readable, seekable, and readable at arbitrary offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReader {
    inner: Cursor<Vec<u8>>,
}

impl ArchiveReader {
    pub fn new(bytes: Vec<u8>) -> Self {
        ArchiveReader {
            inner: Cursor::new(bytes),
        }
    }

    pub fn len(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }

    /// Reads from `offset` without moving the cursor.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let bytes = self.inner.get_ref();
        let start = match usize::try_from(offset) {
            Ok(start) if start < bytes.len() => start,
            _ => return Ok(0),
        };
        let n = buf.len().min(bytes.len() - start);
        buf[..n].copy_from_slice(&bytes[start..start + n]);
        Ok(n)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

impl Read for ArchiveReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for ArchiveReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
