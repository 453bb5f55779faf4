use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub id: i64,
    pub student_name: String,
    pub course_code: String,
    pub comments: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
}

/// Candidate record as submitted by a client. Every field is optional so that
/// missing fields are reported by validation rather than by the JSON decoder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    pub student_name: Option<String>,
    pub course_code: Option<String>,
    pub comments: Option<String>,
    pub rating: Option<RatingInput>,
}

/// Forms post the rating as a string, API clients as a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RatingInput {
    Number(serde_json::Number),
    Text(String),
    Other(serde_json::Value),
}

impl From<i64> for RatingInput {
    fn from(value: i64) -> Self {
        RatingInput::Number(value.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFeedback {
    pub student_name: String,
    pub course_code: String,
    pub comments: String,
    pub rating: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCount {
    pub course_code: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_count: usize,
    pub average_rating: f64,
    pub rating_histogram: BTreeMap<i32, usize>,
    pub course_frequency: BTreeMap<String, usize>,
    pub top_courses: Vec<CourseCount>,
    pub courses_rated: usize,
}
