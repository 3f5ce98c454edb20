pub(crate) mod common;
mod submission;
mod validation;
