//! Core types for docparity
//!
//! This crate defines the data model shared by every other crate:
//! - Value: recursive, dynamically-typed document value
//! - Document: insertion-ordered map of string keys to values
//! - TestSuite / TestCase: canonical, serializable behavioral checks
//! - TestResult / ResultsFile: normalized outcomes of one run
//! - Error: conversion and serialization errors

#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod json;
pub mod result;
pub mod suite;
pub mod value;

pub use document::Document;
pub use error::{Error, Result};
pub use json::value_to_json;
pub use result::{Mode, ResultsFile, Summary, TestResult};
pub use suite::{Expected, Method, SetupOperation, SetupStep, TestAction, TestCase, TestSuite};
pub use value::Value;
