//! Isolated environment builder: Python venv creation.
//!
//! The setup flow asks this module for a venv and gets back `RuntimePaths`;
//! every later step runs through those paths only.

pub mod builder;
