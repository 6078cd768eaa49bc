//! Append-only disk journal for locally submitted transactions.
//!
//! Each record is a little-endian `u32` length prefix followed by the RLP
//! encoding of the signed transaction. Replay stops at the first record that
//! is truncated or fails to decode and chops the file back to the last good
//! offset, so a crash mid-write never poisons the journal.

use ember_types::SignedTransaction;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Failures while reading or writing the journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Filesystem operation failed.
    #[error("journal i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// A record decoded to something that is not a transaction.
    #[error("journal decode error: {0}")]
    Rlp(#[from] rlp::DecoderError),
}

/// Crash-safe journal of local transactions.
///
/// Writes go through an internal mutex so the pool can append from any task
/// without holding its own lock across the syscall.
pub struct Journal {
    path: PathBuf,
    writer: Mutex<Option<File>>,
}

impl Journal {
    /// Create a journal handle at `path`. No file is touched until the
    /// first load, insert or rotation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replay every intact record, truncating any corrupt tail in place.
    /// A missing file is an empty journal.
    pub fn load(&self) -> Result<Vec<SignedTransaction>, JournalError> {
        let mut file = match OpenOptions::new().read(true).write(true).open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        let mut txs = Vec::new();
        let mut offset = 0usize;
        while offset < buf.len() {
            let Some(header) = buf.get(offset..offset + 4) else {
                break;
            };
            let len = u32::from_le_bytes(header.try_into().unwrap()) as usize;
            let Some(payload) = buf.get(offset + 4..offset + 4 + len) else {
                break;
            };
            match rlp::decode::<SignedTransaction>(payload) {
                Ok(tx) => txs.push(tx),
                Err(err) => {
                    warn!(offset, error = %err, "journal record corrupt, truncating tail");
                    break;
                }
            }
            offset += 4 + len;
        }

        if offset < buf.len() {
            warn!(
                good = offset,
                total = buf.len(),
                "dropping corrupt journal tail"
            );
            file.set_len(offset as u64)?;
        }
        debug!(count = txs.len(), path = %self.path.display(), "journal replayed");
        Ok(txs)
    }

    /// Append one transaction record and flush it to disk.
    pub fn insert(&self, tx: &SignedTransaction) -> Result<(), JournalError> {
        let mut guard = self.writer.lock();
        if guard.is_none() {
            *guard = Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)?,
            );
        }
        let file = guard.as_mut().unwrap();
        write_record(file, tx)?;
        file.flush()?;
        Ok(())
    }

    /// Atomically rewrite the journal to contain exactly `txs`.
    ///
    /// The new content is written to a sibling file, synced, and renamed
    /// over the old journal, then the append handle is reopened on the
    /// fresh file.
    pub fn rotate(&self, txs: &[SignedTransaction]) -> Result<(), JournalError> {
        let mut guard = self.writer.lock();
        *guard = None;

        let tmp = self.path.with_extension("new");
        let mut file = File::create(&tmp)?;
        for tx in txs {
            write_record(&mut file, tx)?;
        }
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, &self.path)?;

        *guard = Some(OpenOptions::new().append(true).open(&self.path)?);
        debug!(count = txs.len(), path = %self.path.display(), "journal rotated");
        Ok(())
    }
}

fn write_record(file: &mut File, tx: &SignedTransaction) -> Result<(), JournalError> {
    let payload = rlp::encode(tx);
    file.write_all(&(payload.len() as u32).to_le_bytes())?;
    file.write_all(&payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ember_crypto::Signature;
    use ember_primitives::{Address, U256};
    use ember_types::TxMessage;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "ember-journal-{}-{}.rlp",
            std::process::id(),
            n
        ))
    }

    fn tx(nonce: u64) -> SignedTransaction {
        TxMessage {
            nonce,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Some(Address::from_bytes([0x42; 20])),
            value: U256::from(1u64),
            payload: Bytes::new(),
        }
        .into_signed(Signature::new([1; 32], [2; 32], 27))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let journal = Journal::new(temp_path());
        assert!(journal.load().unwrap().is_empty());
    }

    #[test]
    fn test_insert_then_load_round_trip() {
        let path = temp_path();
        let journal = Journal::new(path.clone());
        for nonce in 0..5 {
            journal.insert(&tx(nonce)).unwrap();
        }

        let replayed = Journal::new(path.clone()).load().unwrap();
        assert_eq!(replayed.len(), 5);
        assert_eq!(replayed[3].nonce(), 3);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_corrupt_tail_truncated() {
        let path = temp_path();
        let journal = Journal::new(path.clone());
        journal.insert(&tx(0)).unwrap();
        journal.insert(&tx(1)).unwrap();

        // simulate a crash mid-append: a length prefix with half a payload
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(&[0xde, 0xad, 0xbe, 0xef]).unwrap();
        drop(file);

        let good_len = {
            let journal = Journal::new(path.clone());
            let replayed = journal.load().unwrap();
            assert_eq!(replayed.len(), 2);
            std::fs::metadata(&path).unwrap().len()
        };

        // a second replay sees a clean file of the same length
        let replayed = Journal::new(path.clone()).load().unwrap();
        assert_eq!(replayed.len(), 2);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_garbage_record_truncated() {
        let path = temp_path();
        let journal = Journal::new(path.clone());
        journal.insert(&tx(0)).unwrap();

        // a complete record whose payload is not a transaction
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&3u32.to_le_bytes()).unwrap();
        file.write_all(&[0x01, 0x02, 0x03]).unwrap();
        drop(file);

        let replayed = Journal::new(path.clone()).load().unwrap();
        assert_eq!(replayed.len(), 1);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_rotate_rewrites_content() {
        let path = temp_path();
        let journal = Journal::new(path.clone());
        for nonce in 0..10 {
            journal.insert(&tx(nonce)).unwrap();
        }

        // keep only two survivors
        journal.rotate(&[tx(7), tx(8)]).unwrap();
        // appends keep working on the rotated file
        journal.insert(&tx(9)).unwrap();

        let replayed = Journal::new(path.clone()).load().unwrap();
        let nonces: Vec<u64> = replayed.iter().map(|t| t.nonce()).collect();
        assert_eq!(nonces, vec![7, 8, 9]);
        std::fs::remove_file(path).unwrap();
    }
}
