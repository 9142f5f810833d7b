// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

#![feature(error_generic_member_access)]

use std::backtrace::Backtrace;
use std::error::Error;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Wraps any error that the caller is not expected to handle explicitly.
///
/// The original error is kept as the source, so lower layers can still be
/// inspected via [`InternalError::find_source`] when a caller needs to tell
/// e.g. a lock conflict apart from a genuine failure.
#[derive(Error, Debug)]
#[error("Internal error")]
pub struct InternalError {
    #[source]
    source: BoxedError,
    backtrace: Backtrace,
}

impl InternalError {
    pub fn new<E: Into<BoxedError>>(e: E) -> Self {
        Self {
            source: e.into(),
            backtrace: Backtrace::capture(),
        }
    }

    pub fn bail<T>(reason: impl Into<String>) -> Result<T, Self> {
        Err(Self::new(InternalErrorBail::new(reason)))
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Walks the source chain and returns the first error of type `E`
    pub fn find_source<E: Error + 'static>(&self) -> Option<&E> {
        let first: &(dyn Error + 'static) = self.source.as_ref();
        let mut current = Some(first);

        while let Some(err) = current {
            if let Some(typed) = err.downcast_ref::<E>() {
                return Some(typed);
            }
            current = err.source();
        }

        None
    }

    /// Returns the reason string if this error was produced by
    /// [`InternalError::bail`]
    pub fn bail_reason(&self) -> Option<&str> {
        self.source
            .downcast_ref::<InternalErrorBail>()
            .map(|bail| bail.reason.as_str())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
#[error("Error: {reason}")]
struct InternalErrorBail {
    reason: String,
}

impl InternalErrorBail {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub trait ErrorIntoInternal {
    fn int_err(self) -> InternalError;
}

impl<E> ErrorIntoInternal for E
where
    E: Into<BoxedError>,
{
    fn int_err(self) -> InternalError {
        InternalError::new(self)
    }
}

pub trait ResultIntoInternal<OK> {
    fn int_err(self) -> Result<OK, InternalError>;
}

impl<OK, E> ResultIntoInternal<OK> for Result<OK, E>
where
    E: Into<BoxedError>,
{
    fn int_err(self) -> Result<OK, InternalError> {
        match self {
            Ok(ok) => Ok(ok),
            Err(e) => Err(e.int_err()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
