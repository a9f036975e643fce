//! Sequential failover across candidate printers
//!
//! A logical print must land on exactly one device, so candidates are tried
//! one after the other, never in parallel. The first success wins and later
//! candidates are not touched; earlier candidates may already have been
//! attempted (and may have partially printed) by then.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// One failed attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptFailure {
    pub printer_id: String,
    pub error: String,
}

#[derive(Debug, Error)]
pub enum FailoverError {
    /// Nothing to try: misconfiguration, not an outage
    #[error("No printers available")]
    NoCandidates,

    /// Every candidate was tried and failed
    #[error("All printers failed: {}", summarize(.failures))]
    Exhausted { failures: Vec<AttemptFailure> },
}

impl FailoverError {
    /// Every recorded attempt, in the order they were made
    pub fn failures(&self) -> &[AttemptFailure] {
        match self {
            Self::NoCandidates => &[],
            Self::Exhausted { failures } => failures,
        }
    }

    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        self.failures().last()
    }
}

fn summarize(failures: &[AttemptFailure]) -> String {
    match failures.last() {
        Some(last) => format!(
            "{} attempt(s), last error on {}: {}",
            failures.len(),
            last.printer_id,
            last.error
        ),
        None => "no attempts".to_string(),
    }
}

/// Result of a successful failover run
#[derive(Debug)]
pub struct Succeeded<T> {
    /// Candidate that succeeded
    pub printer_id: String,
    pub value: T,
    /// Candidates that failed before it
    pub failures: Vec<AttemptFailure>,
}

/// Runs an operation against candidates in order until one succeeds
#[derive(Debug, Clone)]
pub struct FailoverExecutor {
    attempt_timeout: Duration,
}

impl FailoverExecutor {
    /// Every attempt is cut off after `attempt_timeout`
    pub fn new(attempt_timeout: Duration) -> Self {
        Self { attempt_timeout }
    }

    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn execute<T, E, F, Fut>(
        &self,
        candidates: &[String],
        mut attempt: F,
    ) -> Result<Succeeded<T>, FailoverError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if candidates.is_empty() {
            warn!("No candidate printers");
            return Err(FailoverError::NoCandidates);
        }

        let mut failures = Vec::new();

        for printer_id in candidates {
            let error = match tokio::time::timeout(self.attempt_timeout, attempt(printer_id.clone()))
                .await
            {
                Ok(Ok(value)) => {
                    if failures.is_empty() {
                        debug!(printer_id = %printer_id, "Printed on first candidate");
                    } else {
                        info!(
                            printer_id = %printer_id,
                            failed = failures.len(),
                            "Printed after failover"
                        );
                    }
                    return Ok(Succeeded {
                        printer_id: printer_id.clone(),
                        value,
                        failures,
                    });
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {} ms", self.attempt_timeout.as_millis()),
            };

            warn!(printer_id = %printer_id, error = %error, "Printer failed, trying next");
            failures.push(AttemptFailure {
                printer_id: printer_id.clone(),
                error,
            });
        }

        error!(attempts = failures.len(), "All candidate printers failed");
        Err(FailoverError::Exhausted { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn executor() -> FailoverExecutor {
        FailoverExecutor::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_first_success_stops() {
        let tried = Mutex::new(Vec::new());
        let result = executor()
            .execute(&ids(&["a", "b", "c"]), |id| {
                tried.lock().unwrap().push(id.clone());
                async move { Ok::<_, String>(id) }
            })
            .await
            .unwrap();

        assert_eq!(result.printer_id, "a");
        assert_eq!(result.value, "a");
        assert!(result.failures.is_empty());
        assert_eq!(*tried.lock().unwrap(), ids(&["a"]));
    }

    #[tokio::test]
    async fn test_tries_in_order_until_success() {
        let tried = Mutex::new(Vec::new());
        let result = executor()
            .execute(&ids(&["a", "b", "c", "d"]), |id| {
                tried.lock().unwrap().push(id.clone());
                async move {
                    if id == "c" {
                        Ok(())
                    } else {
                        Err(format!("{} offline", id))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result.printer_id, "c");
        assert_eq!(*tried.lock().unwrap(), ids(&["a", "b", "c"]));
        assert_eq!(
            result.failures,
            vec![
                AttemptFailure {
                    printer_id: "a".into(),
                    error: "a offline".into()
                },
                AttemptFailure {
                    printer_id: "b".into(),
                    error: "b offline".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_all_fail_carries_last_error() {
        let err = executor()
            .execute(&ids(&["a", "b"]), |id| async move {
                Err::<(), _>(format!("{} jammed", id))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, FailoverError::Exhausted { .. }));
        assert_eq!(err.failures().len(), 2);
        let last = err.last_failure().unwrap();
        assert_eq!(last.printer_id, "b");
        assert_eq!(last.error, "b jammed");
        assert!(err.to_string().contains("b jammed"));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let err = executor()
            .execute(&[], |_id| async move { Ok::<_, String>(()) })
            .await
            .unwrap_err();

        assert!(matches!(err, FailoverError::NoCandidates));
        assert!(err.failures().is_empty());
    }

    #[tokio::test]
    async fn test_hanging_attempt_times_out() {
        let executor = FailoverExecutor::new(Duration::from_millis(50));
        let result = executor
            .execute(&ids(&["stuck", "ok"]), |id| async move {
                if id == "stuck" {
                    std::future::pending::<()>().await;
                }
                Ok::<_, String>(())
            })
            .await
            .unwrap();

        assert_eq!(result.printer_id, "ok");
        assert_eq!(result.failures[0].printer_id, "stuck");
        assert!(result.failures[0].error.contains("timed out"));
    }
}
