//! Disclosure-event value objects and the [`Import`] aggregate that drives a
//! single normalization run.
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate};

use crate::credential::{Credentials, User, ValidationError, bounded};
use crate::table::AutoGenKey;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const MAX_CONTEXT_LEN: usize = 130;
pub const MAX_NAME_LEN: usize = 30;

/// Epoch time in seconds, at day resolution when parsed from a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateInSeconds(pub i64);

impl DateInSeconds {
    /// Parse a `YYYY-MM-DD` date as midnight UTC.
    pub fn parse(date: &str) -> Result<Self, ValidationError> {
        let day = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| ValidationError::InvalidDate(date.to_string()))?;
        let midnight = day
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ValidationError::InvalidDate(date.to_string()))?;
        Ok(Self(midnight.and_utc().timestamp()))
    }
}

impl fmt::Display for DateInSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::from_timestamp(self.0, 0) {
            Some(t) => write!(f, "{}", t.format(DATE_FORMAT)),
            None => write!(f, "{}", self.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Leak {
    pub leak_id: AutoGenKey,
    pub share_date: DateInSeconds,
    pub context: String,
}

impl Leak {
    pub fn new(context: &str, share_date: DateInSeconds) -> Result<Self, ValidationError> {
        Ok(Self {
            leak_id: AutoGenKey::UNASSIGNED,
            share_date,
            context: bounded(context, "leak context", MAX_CONTEXT_LEN)?,
        })
    }
}

impl PartialEq for Leak {
    fn eq(&self, other: &Self) -> bool {
        self.share_date == other.share_date && self.context == other.context
    }
}

impl Eq for Leak {}

impl Hash for Leak {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.share_date.hash(state);
        self.context.hash(state);
    }
}

/// An actor the leak is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BadActor {
    pub ba_id: AutoGenKey,
    pub identifier: String,
}

impl BadActor {
    pub fn new(identifier: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            ba_id: AutoGenKey::UNASSIGNED,
            identifier: bounded(identifier, "bad actor identifier", MAX_NAME_LEN)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub plat_id: AutoGenKey,
    pub name: String,
}

impl Platform {
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            plat_id: AutoGenKey::UNASSIGNED,
            name: bounded(name, "platform name", MAX_NAME_LEN)?,
        })
    }
}

/// Everything one import run writes: the leak, the parsed dump, and the
/// platforms and actors it is attributed to.
#[derive(Debug, Clone)]
pub struct Import {
    pub leak: Leak,
    pub affected_users: HashMap<User, Credentials>,
    pub affected_platforms: Vec<Platform>,
    pub leakers: Vec<BadActor>,
}
