//! Failure taxonomy for upstream requests.

use thiserror::Error;

/// Error returned by a single upstream request or by a whole retry loop.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Connect, timeout or body read failure
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// 2xx response whose body did not match the expected shape
  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),

  /// 429 or 503
  #[error("server returned {status}, will retry")]
  Retryable { status: u16 },

  /// Any other non-2xx status
  #[error("server returned {status}: {body}")]
  Terminal { status: u16, body: String },

  /// Every attempt failed; `source` is the last failure
  #[error("after {attempts} attempts: {source}")]
  Exhausted {
    attempts: u32,
    #[source]
    source: Box<FetchError>,
  },

  #[error("request cancelled")]
  Cancelled,

  #[error("invalid url: {0}")]
  InvalidUrl(#[from] url::ParseError),
}

impl FetchError {
  /// Classify a non-2xx status code.
  pub fn from_status(status: u16, body: String) -> Self {
    match status {
      429 | 503 => FetchError::Retryable { status },
      _ => FetchError::Terminal { status, body },
    }
  }

  /// Whether repeating the same request could plausibly succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      FetchError::Transport(_) | FetchError::Decode(_) | FetchError::Retryable { .. } => true,
      FetchError::Terminal { .. }
      | FetchError::Exhausted { .. }
      | FetchError::Cancelled
      | FetchError::InvalidUrl(_) => false,
    }
  }

  /// Number of attempts consumed, if this error ended a retry loop.
  pub fn attempts(&self) -> Option<u32> {
    match self {
      FetchError::Exhausted { attempts, .. } => Some(*attempts),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_classification() {
    assert!(FetchError::from_status(429, String::new()).is_retryable());
    assert!(FetchError::from_status(503, String::new()).is_retryable());
    assert!(!FetchError::from_status(404, "missing".into()).is_retryable());
    assert!(!FetchError::from_status(500, String::new()).is_retryable());
    assert!(!FetchError::Cancelled.is_retryable());
  }

  #[test]
  fn test_exhausted_message() {
    let err = FetchError::Exhausted {
      attempts: 4,
      source: Box::new(FetchError::from_status(404, "not found".into())),
    };
    assert_eq!(err.to_string(), "after 4 attempts: server returned 404: not found");
    assert_eq!(err.attempts(), Some(4));
  }
}
