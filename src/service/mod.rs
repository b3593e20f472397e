pub mod calculator;
pub mod export;
pub mod resolver;
pub mod search;
pub mod session;
pub mod source;
pub mod spec_filter;

pub use calculator::{calculate_line, calculate_lines, summarize, validate_document};
pub use resolver::{backfill, resolve, Backfill, CandidateRequest, HierarchyCascade};
pub use search::HierarchySearch;
pub use session::{Completion, DocumentSession, LineEntry, LineId, RequestToken};
pub use source::{HierarchySource, SpecificationSource};
pub use spec_filter::{filter_candidates, SpecificationFilterService};
