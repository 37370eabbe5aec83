//! Advanced test suite: property-based and model-checked tests.

mod concurrency_loom;
mod ordering_fuzz;
