//! Utility modules for common functionality
//!
//! Logging and progress reporting for the pipeline, plus the small helpers
//! the TIFF reader and block decoder share.

pub mod logger;
pub mod progress;
pub(crate) mod ifd_utils;
pub(crate) mod string_utils;
pub(crate) mod format_utils;
pub(crate) mod tag_utils;
pub(crate) mod predictor;
