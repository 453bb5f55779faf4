use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{AggregateStats, FeedbackRecord};
use crate::stats;
use crate::validation::{MAX_RATING, MIN_RATING};

/// Immutable view of the record set at one point in time. Rebuilt after every
/// create or delete instead of being patched in place.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub records: Vec<FeedbackRecord>,
    pub stats: AggregateStats,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn capture(records: Vec<FeedbackRecord>) -> Self {
        let stats = stats::aggregate(&records);
        Self {
            records,
            stats,
            taken_at: Utc::now(),
        }
    }
}

pub fn rating_stars(rating: i32) -> String {
    let filled = rating.clamp(0, MAX_RATING) as usize;
    format!(
        "{}{}",
        "★".repeat(filled),
        "☆".repeat(MAX_RATING as usize - filled)
    )
}

fn share_of_total(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub fn build_dashboard(snapshot: &Snapshot) -> String {
    let stats = &snapshot.stats;
    let mut output = String::new();

    let _ = writeln!(output, "# Feedback Dashboard");
    let _ = writeln!(
        output,
        "Generated {}",
        snapshot.taken_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "- Total feedback: {}", stats.total_count);
    let _ = writeln!(output, "- Average rating: {:.2}", stats.average_rating);
    let _ = writeln!(output, "- Courses rated: {}", stats.courses_rated);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Rating Distribution");

    for rating in (MIN_RATING..=MAX_RATING).rev() {
        let count = stats.rating_histogram.get(&rating).copied().unwrap_or(0);
        let _ = writeln!(
            output,
            "- {} {}: {} feedback ({:.0}%)",
            rating,
            rating_stars(rating),
            count,
            share_of_total(count, stats.total_count)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Rated Courses");

    if stats.top_courses.is_empty() {
        let _ = writeln!(output, "No feedback data available.");
    } else {
        for course in stats.top_courses.iter() {
            let _ = writeln!(output, "- {}: {}", course.course_code, course.count);
        }
    }

    output
}

pub fn build_feedback_list(snapshot: &Snapshot, limit: Option<usize>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# All Feedback");

    if snapshot.records.is_empty() {
        let _ = writeln!(output, "No feedback submitted yet.");
        return output;
    }

    let limit = limit.unwrap_or(snapshot.records.len());
    for record in snapshot.records.iter().take(limit) {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {} (#{})", record.course_code, record.id);
        let _ = writeln!(output, "By: {}", record.student_name);
        let _ = writeln!(
            output,
            "Rating: {} ({}/{})",
            rating_stars(record.rating),
            record.rating,
            MAX_RATING
        );
        if !record.comments.is_empty() {
            let _ = writeln!(output, "Comments: {}", record.comments);
        }
        let _ = writeln!(
            output,
            "Submitted on: {}",
            record.created_at.format("%Y-%m-%d %H:%M UTC")
        );
    }

    if snapshot.records.len() > limit {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "... and {} more",
            snapshot.records.len() - limit
        );
    }

    output
}
