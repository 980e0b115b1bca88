// Adapters layer: concrete implementations for external systems (tabular persistence).

pub mod csv_codec;
pub mod store;
