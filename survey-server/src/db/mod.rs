//! Database access for survey-server
//!
//! The pool itself is opened by `survey_common::db::init_database`; this
//! module holds the queries against `survey_responses`.

pub mod surveys;

pub use surveys::{count_surveys, get_survey, insert_survey, list_recent_surveys, StoredSurvey};
