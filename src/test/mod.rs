//! Shared test infrastructure.
//!
//! [`factories`] builds small linked class pools, each shaped for the behavior one group of
//! tests looks at.
