//! # RocksDB Key/Value Adapter
//!
//! Durable [`KvStore`] behind the `rocksdb` feature. Batches are applied with
//! a native `WriteBatch`, so a committed block is all-or-nothing on disk.

use std::path::Path;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};

use crate::domain::errors::StoreError;
use crate::ports::{KvOp, KvStore};

/// RocksDB tuning knobs.
#[derive(Debug, Clone)]
pub struct RocksKvConfig {
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Write buffer size in bytes (default: 32MB)
    pub write_buffer_size: usize,
    /// fsync after each batch (default: true)
    pub sync_writes: bool,
}

impl Default for RocksKvConfig {
    fn default() -> Self {
        Self {
            block_cache_size: 64 * 1024 * 1024,
            write_buffer_size: 32 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksKvConfig {
    /// Small buffers, no fsync.
    pub fn for_testing() -> Self {
        Self {
            block_cache_size: 8 * 1024 * 1024,
            write_buffer_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

fn backend(op: &str, err: rocksdb::Error) -> StoreError {
    StoreError::Backend(format!("rocksdb {op} failed: {err}"))
}

pub struct RocksKvStore {
    db: DB,
    config: RocksKvConfig,
}

impl RocksKvStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>, config: RocksKvConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let db = DB::open(&opts, path).map_err(|e| backend("open", e))?;
        Ok(Self { db, config })
    }

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.config.sync_writes);
        opts
    }
}

impl KvStore for RocksKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db.get(key).map_err(|e| backend("get", e))
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.db
            .put_opt(key, value, &self.write_options())
            .map_err(|e| backend("put", e))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.db
            .delete_opt(key, &self.write_options())
            .map_err(|e| backend("delete", e))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut results = Vec::new();
        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|e| backend("scan", e))?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }
        Ok(results)
    }

    fn write_batch(&mut self, batch: Vec<KvOp>) -> Result<(), StoreError> {
        let mut native = WriteBatch::default();
        for op in batch {
            match op {
                KvOp::Set { key, value } => native.put(key, value),
                KvOp::Delete { key } => native.delete(key),
            }
        }
        self.db
            .write_opt(native, &self.write_options())
            .map_err(|e| backend("batch write", e))
    }
}
