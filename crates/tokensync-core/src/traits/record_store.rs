// # Record Store Trait
//
// Defines the keyed storage the reconciler reads and writes.
//
// ## Purpose
//
// The store maps an address to a TokenRecord. It is the only persistent
// state of the system: the existing-entry index is rebuilt from it at the
// start of every run.
//
// ## Implementations
//
// - YAML directory: one `<address>.yaml` file per record
// - In-memory: tests and embedding
//
// ## Usage
//
// ```rust,ignore
// use tokensync_core::RecordStore;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     for address in store.list_keys().await? {
//         let record = store.read(&address).await?;
//         println!("{} -> listing {}", address, record.id);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::{Address, TokenRecord};

/// Trait for record store implementations
///
/// # Contract
///
/// - `read` fails with [`crate::Error::NotFound`] when the key is absent
/// - `write` creates or fully overwrites; no field merging
/// - `list_keys` returns every stored address, deprecated or not
///
/// Stores own persistence only. Deciding what to deprecate or overwrite is
/// the reconciler's job.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List every address currently stored
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Address>)`: All keys, in ascending order
    /// - `Err(Error)`: Storage error
    async fn list_keys(&self) -> Result<Vec<Address>, crate::Error>;

    /// Read the record stored under `address`
    ///
    /// # Returns
    ///
    /// - `Ok(TokenRecord)`: The stored record
    /// - `Err(Error::NotFound)`: No record under this key
    /// - `Err(Error)`: Storage or parse error
    async fn read(&self, address: &str) -> Result<TokenRecord, crate::Error>;

    /// Create or fully replace the record stored under `address`
    async fn write(&self, address: &str, record: &TokenRecord) -> Result<(), crate::Error>;

    /// Persist any pending changes
    ///
    /// Implementations that write through may treat this as a no-op.
    async fn flush(&self) -> Result<(), crate::Error> {
        Ok(())
    }
}
