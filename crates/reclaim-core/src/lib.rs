pub mod credential;
pub mod reconcile;

pub use credential::{acquire_credential, authorize_and_store, refresh_stored_credential, AuthMode, CredentialError};
pub use reconcile::{NoopObserver, ReconcileError, ReconcileObserver, ReconcileOptions, ReconcileSummary, Reconciler};
