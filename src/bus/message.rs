//! Request envelopes and failure replies
//!
//! A `Request` lives for exactly one dispatch. Its reply capability is
//! consumed by `reply` or `fail`, so a request can be answered at most once.

use super::Address;
use crate::core::{MarketDataAction, ACTION_HEADER};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::oneshot;
use tracing::Level;
use uuid::Uuid;

/// Failure codes returned to requesters (stable ordinals)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Request carried no `action` header
    NoActionSpecified = 0,
    /// `action` header value is not a known action
    BadAction = 1,
    /// Body could not be decoded for the requested action
    InvalidBody = 2,
}

impl ErrorCode {
    #[inline(always)]
    pub const fn code(&self) -> i32 {
        *self as i32
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::NoActionSpecified => "NO_ACTION_SPECIFIED",
            Self::BadAction => "BAD_ACTION",
            Self::InvalidBody => "INVALID_BODY",
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// Failure reply: integer code plus human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub code: ErrorCode,
    pub message: String,
}

impl Failure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome delivered through a reply capability
pub type Reply = Result<Value, Failure>;

/// Request headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers carrying only the given action
    pub fn for_action(action: MarketDataAction) -> Self {
        Self::new().with(ACTION_HEADER, action.name())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One inbound message: headers, body and an optional reply capability
#[derive(Debug)]
pub struct Request {
    id: Uuid,
    address: Address,
    headers: Headers,
    body: Value,
    reply_to: Option<oneshot::Sender<Reply>>,
}

impl Request {
    /// Fire-and-forget request (no reply capability)
    pub fn new(address: Address, headers: Headers, body: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            address,
            headers,
            body,
            reply_to: None,
        }
    }

    /// Request whose outcome is delivered to the returned receiver
    pub fn with_reply(
        address: Address,
        headers: Headers,
        body: Value,
    ) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        let mut request = Self::new(address, headers, body);
        request.reply_to = Some(tx);
        (request, rx)
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn address(&self) -> Address {
        self.address
    }

    #[inline]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn expects_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    /// Answer the requester
    pub fn reply(self, value: Value) {
        self.respond(Ok(value));
    }

    /// Fail the request with a code and message
    pub fn fail(self, code: ErrorCode, message: impl Into<String>) {
        self.respond(Err(Failure::new(code, message)));
    }

    fn respond(self, reply: Reply) {
        match self.reply_to {
            Some(tx) => {
                if tx.send(reply).is_err() {
                    crate::log_bus!(Level::DEBUG, request_id = %self.id, "Requester went away before reply on {}", self.address);
                }
            }
            None => {
                crate::log_bus!(Level::DEBUG, request_id = %self.id, "Reply dropped, request on {} was fire-and-forget", self.address);
            }
        }
    }
}
