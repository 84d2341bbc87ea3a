//! Integration tests driving the monorail binary against temporary git repositories
//!
//! The fake runners are `sh` scripts, so these only run on Unix.

#![cfg(unix)]

mod helpers;
mod test_affected;
mod test_start;
mod test_test;
