//! medquiz — format-aware multiple-choice question extraction from
//! medical-textbook PDFs.
//!
//! The extraction core (normalize, detect, segment, parse, validate) is
//! pure, synchronous computation; the generative fallback is the only
//! suspension point. Everything around it (the PDF text source, the
//! SQLite store, the job driver, the HTTP API in the server binary) is
//! thin plumbing over that core.

pub mod ai_extractor;
pub mod db;
pub mod extract;
pub mod format;
pub mod jobs;
pub mod merge;
pub mod normalize;
pub mod parsers;
pub mod pdf;
pub mod question;
pub mod segmenter;
pub mod selector;
pub mod settings;
pub mod utils;
pub mod validator;

pub use format::FormatTag;
pub use question::Question;
