//! Oracle interface and adapters.
//!
//! The engine only ever calls [`Oracle::generate`]. Adapters compose around
//! any backend:
//! - [`RetryingOracle`] retries transient transport failures with backoff
//! - [`MeteredOracle`] feeds call counts and latency into the metrics
//! - [`ScriptedOracle`] and [`FnOracle`] are deterministic doubles

pub mod metered;
pub mod mock;
pub mod retrying;
pub mod traits;

pub use metered::MeteredOracle;
pub use mock::{FnOracle, ScriptedOracle};
pub use retrying::RetryingOracle;
pub use traits::{Oracle, ask};
