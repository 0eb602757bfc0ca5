//! # Script Runner
//!
//! Purpose: Execute a named script on a session, referencing it by hash and
//! uploading the source only when the store has forgotten it.
//!
//! ```text
//! EVALSHA <sha1> args...  --(-NOSCRIPT ...)-->  EVAL <source> args...  --> reply
//! ```
//!
//! The fallback happens at most once per call.

use std::sync::Arc;

use skv_client::{RespValue, Session};
use tracing::debug;

use crate::cache::ScriptCache;
use crate::error::{ScriptError, ScriptResult};

/// Error-reply marker for a hash the store does not hold.
pub const NOSCRIPT: &[u8] = b"NOSCRIPT";

/// Runs cached scripts against sessions.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    cache: Arc<ScriptCache>,
}

impl ScriptRunner {
    /// Creates a runner over a shared cache.
    pub fn new(cache: Arc<ScriptCache>) -> Self {
        ScriptRunner { cache }
    }

    /// Cache this runner reads from.
    pub fn cache(&self) -> &Arc<ScriptCache> {
        &self.cache
    }

    /// Runs script `name` with `args` passed through in order.
    ///
    /// `args` must already follow the script's own `numkeys` convention.
    pub fn run(&self, session: &mut Session, name: &str, args: &[&[u8]]) -> ScriptResult<RespValue> {
        let script = self.cache.get_or_load(name)?;

        let mut frame: Vec<&[u8]> = Vec::with_capacity(args.len() + 1);
        frame.push(script.sha1().as_bytes());
        frame.extend_from_slice(args);

        let reply = session.send_command(b"EVALSHA", &frame)?;
        if !is_noscript(&reply) {
            return into_result(reply);
        }

        debug!(script = name, sha1 = script.sha1(), "store lost script, sending source");
        frame[0] = script.source();
        into_result(session.send_command(b"EVAL", &frame)?)
    }
}

fn is_noscript(reply: &RespValue) -> bool {
    reply
        .error_message()
        .map_or(false, |message| message.windows(NOSCRIPT.len()).any(|part| part == NOSCRIPT))
}

fn into_result(reply: RespValue) -> ScriptResult<RespValue> {
    match reply {
        RespValue::Error(message) => Err(ScriptError::store(&message)),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noscript_is_matched_anywhere_in_the_message() {
        assert!(is_noscript(&RespValue::Error(b"NOSCRIPT No matching script".to_vec())));
        assert!(is_noscript(&RespValue::Error(b"ERR NOSCRIPT".to_vec())));
        assert!(!is_noscript(&RespValue::Error(b"ERR noscript".to_vec())));
        assert!(!is_noscript(&RespValue::Bulk(Some(b"NOSCRIPT".to_vec()))));
    }

    #[test]
    fn error_replies_become_store_errors() {
        let err = into_result(RespValue::Error(b"ERR bad".to_vec())).unwrap_err();
        assert!(matches!(err, ScriptError::Store { ref message } if message == "ERR bad"));
        assert_eq!(
            into_result(RespValue::Integer(3)).unwrap(),
            RespValue::Integer(3)
        );
    }
}
