// Source handle — one site's archive plus a per-call time budget.
//
// Every store call goes through `bounded`, which wraps it in
// tokio::time::timeout. An expired call becomes StoreError::Timeout so the
// fan-out code can isolate that site instead of hanging on it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::traits::{Archive, EntryStat};
use crate::error::StoreError;

#[derive(Clone)]
pub struct SourceHandle {
    archive: Arc<dyn Archive>,
    default_timeout: Option<Duration>,
}

impl SourceHandle {
    pub fn new(archive: Arc<dyn Archive>, default_timeout: Option<Duration>) -> Self {
        Self {
            archive,
            default_timeout,
        }
    }

    pub fn archive(&self) -> &Arc<dyn Archive> {
        &self.archive
    }

    pub async fn read_file(
        &self,
        path: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, StoreError> {
        self.bounded("read_file", timeout, self.archive.read_file(path))
            .await
    }

    pub async fn write_file(&self, path: &str, data: &[u8]) -> Result<(), StoreError> {
        self.bounded("write_file", None, self.archive.write_file(path, data))
            .await
    }

    pub async fn readdir(
        &self,
        path: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<String>, StoreError> {
        self.bounded("readdir", timeout, self.archive.readdir(path))
            .await
    }

    pub async fn stat(
        &self,
        path: &str,
        timeout: Option<Duration>,
    ) -> Result<EntryStat, StoreError> {
        self.bounded("stat", timeout, self.archive.stat(path)).await
    }

    pub async fn mkdir(&self, path: &str) -> Result<(), StoreError> {
        self.bounded("mkdir", None, self.archive.mkdir(path)).await
    }

    pub async fn commit(&self) -> Result<(), StoreError> {
        self.bounded("commit", None, self.archive.commit()).await
    }

    async fn bounded<T, F>(
        &self,
        op: &'static str,
        timeout: Option<Duration>,
        fut: F,
    ) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match timeout.or(self.default_timeout) {
            Some(after) => match tokio::time::timeout(after, fut).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(url = self.archive.url(), op, ?after, "Store call timed out");
                    Err(StoreError::Timeout { op, after })
                }
            },
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryArchive;

    #[tokio::test]
    async fn slow_archive_times_out() {
        let archive = Arc::new(MemoryArchive::new("dat://slow"));
        archive.set_latency(Some(Duration::from_millis(300)));
        let handle = SourceHandle::new(archive, None);

        let err = handle
            .readdir("/", Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn per_call_timeout_overrides_default() {
        let archive = Arc::new(MemoryArchive::new("dat://slow"));
        archive.set_latency(Some(Duration::from_millis(50)));
        let handle = SourceHandle::new(archive, Some(Duration::from_millis(5)));

        // The generous per-call budget wins over the tight default.
        let names = handle
            .readdir("/", Some(Duration::from_secs(2)))
            .await
            .unwrap();
        assert!(names.is_empty());
    }
}
