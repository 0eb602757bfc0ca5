//! # Reply Shaping
//!
//! Purpose: Turn a script outcome into the body handed back to the client.
//! Scripts answer with a JSON document in a string reply; that document is
//! forwarded verbatim. Every failure becomes `{"code": N, "msg": "..."}`.

use serde::Serialize;
use skv_client::RespValue;
use skv_script::ScriptResult;

/// Client-visible outcome codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    Success = 0,
    InvalidRequest = 1,
    Store = 2,
    Script = 3,
}

impl ReplyCode {
    /// Numeric wire code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Canned message for the code.
    pub fn message(self) -> &'static str {
        match self {
            ReplyCode::Success => "Success",
            ReplyCode::InvalidRequest => "Failure: some field not exist!",
            ReplyCode::Store => "Failure: store error!",
            ReplyCode::Script => "Failure: script error!",
        }
    }
}

/// Body returned for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// JSON produced by the script.
    Json(String),
    /// Failure with its code and message.
    Failure { code: ReplyCode, msg: String },
}

#[derive(Serialize)]
struct FailureBody<'a> {
    code: i32,
    msg: &'a str,
}

impl Reply {
    /// Failure with a custom message.
    pub fn failure(code: ReplyCode, msg: impl Into<String>) -> Self {
        Reply::Failure {
            code,
            msg: msg.into(),
        }
    }

    /// Failure with the code's canned message.
    pub fn canned(code: ReplyCode) -> Self {
        Reply::failure(code, code.message())
    }

    /// Shapes the outcome of a script run.
    pub fn from_script(result: ScriptResult<RespValue>) -> Self {
        let value = match result {
            Ok(value) => value,
            Err(err) => return Reply::failure(ReplyCode::Store, err.to_string()),
        };

        let Some(bytes) = value.as_bytes() else {
            return Reply::failure(ReplyCode::Store, "script reply is not a string");
        };
        let text = String::from_utf8_lossy(bytes);
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(_) => Reply::Json(text.into_owned()),
            Err(_) => Reply::failure(ReplyCode::Script, format!("\"{}\" should be a json", text)),
        }
    }

    /// Outcome code.
    pub fn code(&self) -> ReplyCode {
        match self {
            Reply::Json(_) => ReplyCode::Success,
            Reply::Failure { code, .. } => *code,
        }
    }

    /// Serialized response body.
    pub fn body(&self) -> String {
        match self {
            Reply::Json(json) => json.clone(),
            Reply::Failure { code, msg } => serde_json::to_string(&FailureBody {
                code: code.code(),
                msg,
            })
            .unwrap_or_else(|_| format!("{{\"code\":{}}}", code.code())),
        }
    }
}
