// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::types::ops::{clone_var, destroy_var};
use crate::types::var::Var;
use std::fmt;
use std::ops::Deref;

/// An owned deep copy of a [`Var`], destroyed when dropped.
#[derive(Default)]
pub struct ClonedVar(Var);

impl ClonedVar {
    pub fn new(source: &Var) -> Self {
        let mut value = Var::NONE;
        clone_var(&mut value, source);
        Self(value)
    }

    /// Take ownership of a value the caller would otherwise have to destroy.
    pub fn adopt(value: Var) -> Self {
        Self(value)
    }

    pub fn var(&self) -> &Var {
        &self.0
    }

    /// Replace the content with a deep copy of `source`.
    pub fn assign(&mut self, source: &Var) {
        clone_var(&mut self.0, source);
    }

    pub fn reset(&mut self) {
        destroy_var(&mut self.0);
    }
}

impl Drop for ClonedVar {
    fn drop(&mut self) {
        destroy_var(&mut self.0);
    }
}

impl Clone for ClonedVar {
    fn clone(&self) -> Self {
        ClonedVar::new(&self.0)
    }
}

impl Deref for ClonedVar {
    type Target = Var;

    fn deref(&self) -> &Var {
        &self.0
    }
}

impl From<&Var> for ClonedVar {
    fn from(value: &Var) -> Self {
        ClonedVar::new(value)
    }
}

impl From<i64> for ClonedVar {
    fn from(value: i64) -> Self {
        ClonedVar(Var::from(value))
    }
}

impl From<f64> for ClonedVar {
    fn from(value: f64) -> Self {
        ClonedVar(Var::from(value))
    }
}

impl From<bool> for ClonedVar {
    fn from(value: bool) -> Self {
        ClonedVar(Var::from(value))
    }
}

impl From<&str> for ClonedVar {
    fn from(value: &str) -> Self {
        ClonedVar(Var::new_string(value))
    }
}

impl PartialEq for ClonedVar {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialEq<Var> for ClonedVar {
    fn eq(&self, other: &Var) -> bool {
        &self.0 == other
    }
}

impl fmt::Debug for ClonedVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ClonedVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::alloc::live_allocations;

    #[test]
    fn drop_releases_the_owned_copy() {
        let before = live_allocations();
        {
            let value = ClonedVar::from("owned text");
            let copy = value.clone();
            assert_eq!(copy.as_str(), "owned text");
            assert!(live_allocations() > before);
        }
        assert_eq!(live_allocations(), before);
    }

    #[test]
    fn assign_replaces_previous_content() {
        let before = live_allocations();
        let mut value = ClonedVar::from("first");
        value.assign(&Var::from(9i64));
        assert_eq!(value.as_int(), 9);
        assert_eq!(live_allocations(), before);
    }
}
