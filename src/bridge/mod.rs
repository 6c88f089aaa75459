//! Process bridge to Python model runners

mod python;

pub use python::{probe_python_module, PythonRunner, DEFAULT_PYTHON};
