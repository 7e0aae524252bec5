//! Types and procedures that represent a command line argument,
//! or collections of command line arguments, for the external tools
//! regis shells out to

use std::{ffi::OsStr, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Type to represent a command line argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument<'a> {
    pub value: &'a str,
}

impl<'a> From<&'a str> for Argument<'a> {
    fn from(value: &'a str) -> Self {
        Self { value }
    }
}

impl<'a> From<String> for Argument<'a> {
    fn from(value: String) -> Argument<'a> {
        Self {
            value: Box::leak(value.into_boxed_str()),
        }
    }
}

impl<'a> From<&'a Path> for Argument<'a> {
    fn from(value: &'a Path) -> Self {
        Self::from(format!("{}", value.display()))
    }
}

impl<'a> From<PathBuf> for Argument<'a> {
    fn from(value: PathBuf) -> Self {
        Self::from(format!("{}", value.display()))
    }
}

impl<'a> From<&PathBuf> for Argument<'a> {
    fn from(value: &PathBuf) -> Self {
        Self::from(format!("{}", value.display()))
    }
}

impl<'a> AsRef<OsStr> for Argument<'a> {
    fn as_ref(&self) -> &OsStr {
        OsStr::new(self.value)
    }
}

impl<'a> core::fmt::Display for Argument<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Strong type to represent a linear collection of [`Argument`]
#[derive(Debug, Default, Clone)]
pub struct Arguments<'a>(Vec<Argument<'a>>);

impl<'a> Arguments<'a> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates and stores a new [`Argument`] at the end of this collection
    pub fn create_and_push<T>(&mut self, val: T)
    where
        T: Into<Argument<'a>>,
    {
        self.0.push(val.into())
    }

    pub fn push(&mut self, arg: Argument<'a>) {
        self.0.push(arg)
    }
}

impl<'a> core::fmt::Display for Arguments<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .iter()
                .map(|argument| argument.value)
                .collect::<Vec<_>>()
                .join(" ")
        )
    }
}

impl<'a, 'b> IntoIterator for &'b Arguments<'a> {
    type Item = &'b Argument<'a>;
    type IntoIter = std::slice::Iter<'b, Argument<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
