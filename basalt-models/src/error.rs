// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use displaydoc::Display;
use thiserror::Error;

/// Model-level errors.
#[non_exhaustive]
#[derive(Clone, Display, Error, Debug)]
pub enum ModelsError {
    /// invalid hash encoding: {0}
    HashParseError(String),
}
