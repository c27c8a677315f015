//! SQLite persistence for Prompt Vault.
//!
//! A [`Store`] wraps one connection to the database file and exposes three
//! views over it:
//! - [`VaultRegistry`]: named namespaces
//! - [`PromptStore`]: prompts and their numbered, immutable versions
//! - [`RunLedger`]: append-only record of executions
//!
//! # Example
//! ```
//! use promptvault_store::Store;
//!
//! let store = Store::open_in_memory().unwrap();
//! store.vaults().create("demo").unwrap();
//! store.prompts().add("demo", "greet", "Hello {{.name}}").unwrap();
//! let v2 = store.prompts().append_version("demo", "greet", "Hi {{.name}}").unwrap();
//! assert_eq!(v2.version, 2);
//! ```

pub mod db;
pub mod prompts;
pub mod runs;
pub mod types;
pub mod vaults;

pub use db::Store;
pub use prompts::PromptStore;
pub use runs::{RunLedger, RUN_LIST_LIMIT};
pub use types::{Prompt, PromptVersion, ResolvedContent, Run, Vault, VersionInfo};
pub use vaults::VaultRegistry;
