use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// End-to-end time bound of one bulk operation.
///
/// Both front-ends are cooperative, so the bound is enforced at row
/// boundaries and before protocol I/O rather than by interrupting a wait.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline(Option<Instant>);

impl Deadline {
    pub fn after(timeout: Option<Duration>) -> Self {
        Self(timeout.map(|t| Instant::now() + t))
    }

    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    pub fn check(&self) -> Result<()> {
        if self.expired() {
            Err(Error::Timeout)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_expires() {
        let deadline = Deadline::after(None);
        assert!(!deadline.expired());
        assert!(deadline.check().is_ok());
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        let deadline = Deadline::after(Some(Duration::ZERO));
        assert!(deadline.expired());
        assert!(matches!(deadline.check(), Err(Error::Timeout)));
    }
}
