//! Per-verb handlers for the server's dispatch table.

use std::sync::Arc;

use sfrodb_core::{Cache, CoreError, FileStore, Uid};
use sfrodb_proto::Status;
use tracing::warn;

/// `ShowData`: cache lookup, then on miss a file-store read and
/// best-effort cache insert.
pub(crate) async fn act_show_data(cache: &Cache, files: &FileStore, uid: &Uid) -> Result<(Status, Vec<u8>), CoreError> {
    if let Some(blob) = cache.get(uid) {
        return Ok((Status::ShowingData, blob.to_vec()));
    }

    let (exists, data) = files.read(uid).await?;
    if !exists {
        return Err(CoreError::NotFound);
    }

    let blob: Arc<[u8]> = Arc::from(data.as_slice());
    if let Err(e) = cache.put(uid, blob) {
        warn!(uid = %uid, error = %e, "cache insert skipped");
    }

    Ok((Status::ShowingData, data))
}

/// `SearchRecord`: cache membership only, never touches disk.
pub(crate) fn act_search_record(cache: &Cache, uid: &Uid) -> (Status, Vec<u8>) {
    if cache.exists(uid) { (Status::RecordExists, Vec::new()) } else { (Status::RecordDoesNotExist, Vec::new()) }
}

/// `SearchFile`: disk presence only, never touches the cache.
pub(crate) async fn act_search_file(files: &FileStore, uid: &Uid) -> Result<(Status, Vec<u8>), CoreError> {
    let exists = files.exists(uid).await?;
    Ok(if exists { (Status::FileExists, Vec::new()) } else { (Status::FileDoesNotExist, Vec::new()) })
}

/// `ForgetRecord`: evicts the key if present; `OK` regardless.
pub(crate) fn act_forget_record(cache: &Cache, uid: &Uid) -> (Status, Vec<u8>) {
    cache.remove(uid);
    (Status::Ok, Vec::new())
}

/// `ResetCache`: clears the whole cache; always `OK`.
pub(crate) fn act_reset_cache(cache: &Cache) -> (Status, Vec<u8>) {
    cache.clear();
    (Status::Ok, Vec::new())
}
