use std::fmt;

use serde::Serialize;

use crate::models::{NewFeedback, RatingInput, ValidFeedback};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Every rule that failed for one candidate, in field order. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn messages(&self) -> Vec<&'static str> {
        self.errors().iter().map(|error| error.message).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Checks a candidate record. All rules run; nothing short-circuits.
pub fn validate(candidate: &NewFeedback) -> Result<ValidFeedback, ValidationErrors> {
    let mut errors = Vec::new();

    let student_name = required_text(candidate.student_name.as_deref());
    if student_name.is_none() {
        errors.push(FieldError {
            field: "studentName",
            message: "Student name is required",
        });
    }

    let course_code = required_text(candidate.course_code.as_deref());
    if course_code.is_none() {
        errors.push(FieldError {
            field: "courseCode",
            message: "Course code is required",
        });
    }

    let rating = match check_rating(candidate.rating.as_ref()) {
        Ok(rating) => Some(rating),
        Err(message) => {
            errors.push(FieldError {
                field: "rating",
                message,
            });
            None
        }
    };

    match (student_name, course_code, rating) {
        (Some(student_name), Some(course_code), Some(rating)) => {
            Ok(ValidFeedback {
                student_name: student_name.to_string(),
                course_code: course_code.to_string(),
                comments: candidate.comments.clone().unwrap_or_default(),
                rating,
            })
        }
        _ => Err(ValidationErrors(errors)),
    }
}

fn required_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn check_rating(value: Option<&RatingInput>) -> Result<i32, &'static str> {
    const REQUIRED: &str = "Rating is required";
    const OUT_OF_RANGE: &str = "Rating must be between 1 and 5";

    let rating = match value {
        None => return Err(REQUIRED),
        Some(RatingInput::Text(text)) if text.trim().is_empty() => return Err(REQUIRED),
        Some(RatingInput::Text(text)) => text.trim().parse::<i64>().ok(),
        Some(RatingInput::Number(number)) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| value.fract() == 0.0 && value.is_finite())
                .map(|value| value as i64)
        }),
        Some(RatingInput::Other(_)) => None,
    };

    rating
        .filter(|rating| (MIN_RATING as i64..=MAX_RATING as i64).contains(rating))
        .map(|rating| rating as i32)
        .ok_or(OUT_OF_RANGE)
}
