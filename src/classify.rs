//! Failure classification and user-facing message substitution

use serde::{Deserialize, Serialize};
use log::trace;

use crate::error::Failure;

/// Transport codes meaning the service could not be reached.
/// Timeouts are included so they retry like any transient fault.
pub const NETWORK_CODES: &[&str] = &[
  "ECONNREFUSED"
, "ENOTFOUND"
, "ENETUNREACH"
, "ETIMEDOUT"
, "ECONNABORTED"
];

/// Taxonomy bucket for a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClassification
{   Network
  , Authentication
  , RateLimit
  , ServerFault
  , ClientFault
  , Unknown
}

impl ErrorClassification
{   /// Whether the retry engine may try again
    pub const fn is_retryable(&self) -> bool
    {   matches!(
          self
        , ErrorClassification::Network
          | ErrorClassification::ServerFault
          | ErrorClassification::RateLimit
        )
    }

    /// Fixed message shown to the user in place of the raw error
    pub fn user_message(&self, failure: &Failure) -> String
    {   match self
        {   ErrorClassification::Authentication => {
              "Invalid API key. Please check your configuration."
                .to_string()
            }
          , ErrorClassification::RateLimit => {
              "Rate limit exceeded. Please try again later."
                .to_string()
            }
          , ErrorClassification::ServerFault => {
              "Server error. Please try again later.".to_string()
            }
          , _ => format!("Request failed: {}", failure.message())
        }
    }
}

/// Map a failure to its classification. First match wins.
pub fn classify(failure: &Failure) -> ErrorClassification
{   let verdict = match failure.status_code()
    {   None if is_network(failure) => ErrorClassification::Network
      , Some(401) | Some(403) => ErrorClassification::Authentication
      , Some(429) => ErrorClassification::RateLimit
      , Some(s) if s >= 500 => ErrorClassification::ServerFault
      , Some(s) if (400..500).contains(&s) => {
          ErrorClassification::ClientFault
        }
      , _ => ErrorClassification::Unknown
    };
    trace!("Classified {:?} as {:?}", failure, verdict);
    verdict
}

fn is_network(failure: &Failure) -> bool
{   if let Some(code) = failure.code()
    {   if NETWORK_CODES.contains(&code)
        {   return true;
        }
    }
    match failure
    {   Failure::Opaque => false
      , _ => failure.message().to_lowercase().contains("network")
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn refused_connection_is_network()
    {   let failure = Failure::transport("ECONNREFUSED", "refused");
        assert_eq!(classify(&failure), ErrorClassification::Network);
    }

    #[test]
    fn timeout_is_network()
    {   let failure = Failure::transport("ETIMEDOUT", "timed out");
        assert_eq!(classify(&failure), ErrorClassification::Network);
    }

    #[test]
    fn network_word_without_code_is_network()
    {   let failure = Failure::from("Network Error");
        assert_eq!(classify(&failure), ErrorClassification::Network);
    }

    #[test]
    fn statuses_map_to_buckets()
    {   let cases = [
          (401, ErrorClassification::Authentication)
        , (403, ErrorClassification::Authentication)
        , (429, ErrorClassification::RateLimit)
        , (500, ErrorClassification::ServerFault)
        , (503, ErrorClassification::ServerFault)
        , (400, ErrorClassification::ClientFault)
        , (418, ErrorClassification::ClientFault)
        ];
        for (status, expected) in cases
        {   assert_eq!(
              classify(&Failure::status(status))
            , expected
            , "status {}"
            , status
            );
        }
    }

    #[test]
    fn status_wins_over_network_message()
    {   let failure = Failure::Status
        {   status: 401
          , body: None
          , message: Some("network auth failed".to_string())
        };
        assert_eq!(
          classify(&failure)
        , ErrorClassification::Authentication
        );
    }

    #[test]
    fn unrecognized_is_unknown()
    {   assert_eq!(
          classify(&Failure::Opaque)
        , ErrorClassification::Unknown
        );
        assert_eq!(
          classify(&Failure::transport("EPIPE", "broken pipe"))
        , ErrorClassification::Unknown
        );
        assert_eq!(
          classify(&Failure::status(302))
        , ErrorClassification::Unknown
        );
    }

    #[test]
    fn only_transient_buckets_retry()
    {   assert!(ErrorClassification::Network.is_retryable());
        assert!(ErrorClassification::ServerFault.is_retryable());
        assert!(ErrorClassification::RateLimit.is_retryable());
        assert!(!ErrorClassification::Authentication.is_retryable());
        assert!(!ErrorClassification::ClientFault.is_retryable());
        assert!(!ErrorClassification::Unknown.is_retryable());
    }

    #[test]
    fn generic_message_carries_underlying_text()
    {   let failure = Failure::from("bad payload");
        assert_eq!(
          ErrorClassification::ClientFault.user_message(&failure)
        , "Request failed: bad payload"
        );
    }
}
