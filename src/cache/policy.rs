//! Response eligibility policy
//!
//! Decides from a response's status code whether it may be cached at all.

use serde::{Deserialize, Serialize};

// == Response Descriptor ==
/// The one thing the cache needs to know about a response to gate a store.
pub trait ResponseDescriptor {
    fn status(&self) -> u16;
}

impl ResponseDescriptor for u16 {
    fn status(&self) -> u16 {
        *self
    }
}

impl ResponseDescriptor for axum::http::StatusCode {
    fn status(&self) -> u16 {
        self.as_u16()
    }
}

// == Status Codes ==
/// Allow-list and deny-list of status codes.
///
/// A code on the deny-list is never cached, even if it is also allowed. An
/// empty allow-list admits every code that is not denied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCodes {
    #[serde(default)]
    pub include: Vec<u16>,
    #[serde(default)]
    pub exclude: Vec<u16>,
}

impl StatusCodes {
    pub fn new(include: Vec<u16>, exclude: Vec<u16>) -> Self {
        Self { include, exclude }
    }

    pub fn admits(&self, status: u16) -> bool {
        if self.exclude.contains(&status) {
            return false;
        }
        self.include.is_empty() || self.include.contains(&status)
    }
}
