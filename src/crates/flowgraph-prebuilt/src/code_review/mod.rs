//! Code review workflows
//!
//! Heuristic review of Python source held under the `code` state key:
//!
//! | Node | Tool | Produces |
//! |------|------|----------|
//! | `extract` | `extract_functions` | `functions`, `function_count` |
//! | `check` | `check_complexity` | `complexity_scores`, `avg_complexity` |
//! | `detect` | `detect_issues` | `detected_issues`, `issue_count` |
//! | `suggest` | `suggest_improvements` | `suggestions`, `quality_score` |
//! | `revise` | | `iteration` |
//! | `finalize` | | `final_quality_score`, `review_completed`, `iterations` |
//!
//! [`code_review_graph`] runs the first four nodes once, then `finalize`.
//! [`code_review_loop_graph`] inserts a bounded revision loop after
//! `suggest`.

pub mod analysis;
pub mod workflow;

pub use analysis::{quality_score, ComplexityScore, FunctionInfo};
pub use workflow::{
    analysis_tools, code_review_graph, code_review_loop_graph, CodeReviewConfig, CODE_REVIEW_TAG,
    DEFAULT_MAX_REVISIONS, DEFAULT_QUALITY_THRESHOLD, REVIEW_GRAPH_ID, REVIEW_LOOP_GRAPH_ID,
};
