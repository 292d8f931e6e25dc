pub mod probe;
pub mod result;
pub mod retry;

pub mod prelude {
    pub use super::probe::{HttpProber, Prober, build_client};
    pub use super::result::{ProbeError, ProbeResult};
    pub use super::retry::RetryPolicy;
}

use std::error::Error;

/// Joins an error with its chain of sources, outermost first.
fn error_chain(err: &(dyn Error + 'static)) -> String {
    std::iter::successors(Some(err), |e| (*e).source())
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
