//! Reactive dashboard state for Tempdash
//!
//! Listens to the document database through the [`DocumentSource`] seam,
//! keeps the reshaped readings in a watchable [`DataStore`], and holds the
//! UI's chart preferences in a [`PreferencesStore`].

pub mod data_store;
pub mod error_mapping;
pub mod memory;
pub mod preferences;
pub mod source;

pub use data_store::{system_clock, Clock, DataStore, StoreHandle, StoreOptions, TemperatureState};
pub use memory::MemorySource;
pub use preferences::{PreferenceError, Preferences, PreferencesStore, TimeRange};
pub use source::{
    ChangeKind, Direction, Document, DocumentChange, DocumentSource, Query, QuerySnapshot,
    SourceError, Subscription,
};
