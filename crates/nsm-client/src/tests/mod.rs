//! Behavioural suites for the client runtime.

mod support;
