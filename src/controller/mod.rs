//! Controller construction: extracting an executable supervisor from a
//! solved supervisory-control instance, then stripping its authority
//! down to the minimal event sets that still realize the same language.

pub mod extractor;
pub mod minimizer;

pub use extractor::construct_supervisor;
pub use minimizer::minimize_authority;
