pub mod adapter;
pub mod fixtures;
pub mod supabase;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::BackendAdapter;
pub use supabase::SupabaseBackend;
pub use traits::Backend;
pub use types::{AuthChange, AuthEvent, AuthSubscription};
