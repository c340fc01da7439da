pub mod grading;
pub mod score_parse;
