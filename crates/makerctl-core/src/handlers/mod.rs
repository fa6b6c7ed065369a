//! Operation handlers, one module per provider
//!
//! Each handler is a pure mapping from [`OpContext`](crate::dispatch::OpContext)
//! to [`OpOutput`](crate::op::OpOutput) and is registered in the builtin
//! dispatch table. They share a small set of conventions: parameters are
//! validated at the point of use, destructive bucket operations require the
//! `force` parameter, and long waits go through the poller.

pub mod aws;
pub mod digitalocean;
pub mod gcp;

use crate::error::{CoreError, Result};
use crate::op::OpParams;

/// Bucket deletion removes every object first; make the caller say so.
pub(crate) fn require_force(params: &OpParams) -> Result<()> {
    if params.get("force") == Some("true") {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "deleting a bucket removes all of its objects; re-run with --force to confirm".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_gate() {
        assert!(require_force(&OpParams::new()).is_err());
        assert!(require_force(&OpParams::new().with("force", "true")).is_ok());
        assert!(require_force(&OpParams::new().with("force", "false")).is_err());
    }
}
