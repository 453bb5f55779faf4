use std::collections::{BTreeMap, HashMap};

use crate::models::{AggregateStats, CourseCount, FeedbackRecord};
use crate::validation::{MAX_RATING, MIN_RATING};

pub const TOP_COURSE_LIMIT: usize = 5;

/// Summarizes the full record set. Recomputed from scratch on every call since
/// deletions can shrink the input.
pub fn aggregate(records: &[FeedbackRecord]) -> AggregateStats {
    let mut rating_histogram: BTreeMap<i32, usize> =
        (MIN_RATING..=MAX_RATING).map(|rating| (rating, 0)).collect();
    let mut rating_sum: i64 = 0;

    // first-encountered order doubles as the tie-break for top courses
    let mut courses: Vec<CourseCount> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for record in records {
        rating_sum += i64::from(record.rating);
        if let Some(bucket) = rating_histogram.get_mut(&record.rating) {
            *bucket += 1;
        }

        match positions.get(record.course_code.as_str()) {
            Some(&index) => courses[index].count += 1,
            None => {
                positions.insert(record.course_code.as_str(), courses.len());
                courses.push(CourseCount {
                    course_code: record.course_code.clone(),
                    count: 1,
                });
            }
        }
    }

    let course_frequency = courses
        .iter()
        .map(|course| (course.course_code.clone(), course.count))
        .collect();

    let courses_rated = courses.len();
    let mut top_courses = courses;
    top_courses.sort_by(|a, b| b.count.cmp(&a.count));
    top_courses.truncate(TOP_COURSE_LIMIT);

    AggregateStats {
        total_count: records.len(),
        average_rating: average_rating(rating_sum, records.len()),
        rating_histogram,
        course_frequency,
        top_courses,
        courses_rated,
    }
}

pub fn average_rating(rating_sum: i64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }

    round_to_hundredths(rating_sum as f64 / count as f64)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample_record(id: i64, course_code: &str, rating: i32) -> FeedbackRecord {
        FeedbackRecord {
            id,
            student_name: "Avery Lee".to_string(),
            course_code: course_code.to_string(),
            comments: String::new(),
            rating,
            created_at: Utc::now() - Duration::minutes(id),
        }
    }

    fn records(entries: &[(&str, i32)]) -> Vec<FeedbackRecord> {
        entries
            .iter()
            .enumerate()
            .map(|(index, (course, rating))| sample_record(index as i64 + 1, course, *rating))
            .collect()
    }

    #[test]
    fn empty_input_yields_zeroed_stats() {
        let stats = aggregate(&[]);
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.average_rating, 0.0);
        assert_eq!(stats.rating_histogram.len(), 5);
        assert!(stats.rating_histogram.values().all(|count| *count == 0));
        assert!(stats.course_frequency.is_empty());
        assert!(stats.top_courses.is_empty());
        assert_eq!(stats.courses_rated, 0);
    }

    #[test]
    fn averages_and_buckets_ratings() {
        let stats = aggregate(&records(&[
            ("CS101", 5),
            ("CS101", 5),
            ("MA201", 4),
            ("PH110", 3),
        ]));
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.average_rating, 4.25);

        let expected: BTreeMap<i32, usize> = [(1, 0), (2, 0), (3, 1), (4, 1), (5, 2)]
            .into_iter()
            .collect();
        assert_eq!(stats.rating_histogram, expected);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let stats = aggregate(&records(&[("CS101", 5), ("CS101", 4), ("CS101", 4)]));
        assert_eq!(stats.average_rating, 4.33);
        assert_eq!(average_rating(5, 3), 1.67);
    }

    #[test]
    fn counts_courses_and_ranks_them() {
        let stats = aggregate(&records(&[("CS101", 4), ("CS101", 2), ("MA201", 5)]));
        assert_eq!(stats.course_frequency.get("CS101"), Some(&2));
        assert_eq!(stats.course_frequency.get("MA201"), Some(&1));
        assert_eq!(stats.courses_rated, 2);
        assert_eq!(
            stats.top_courses,
            vec![
                CourseCount {
                    course_code: "CS101".to_string(),
                    count: 2
                },
                CourseCount {
                    course_code: "MA201".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn ties_keep_first_encountered_order_and_cap_at_five() {
        let stats = aggregate(&records(&[
            ("ZZ900", 3),
            ("AA100", 3),
            ("MM500", 3),
            ("BB200", 3),
            ("CC300", 3),
            ("DD400", 3),
            ("DD400", 3),
        ]));
        let ranked: Vec<_> = stats
            .top_courses
            .iter()
            .map(|course| course.course_code.as_str())
            .collect();
        assert_eq!(ranked, vec!["DD400", "ZZ900", "AA100", "MM500", "BB200"]);
        assert_eq!(stats.courses_rated, 6);
    }

    #[test]
    fn aggregation_is_repeatable() {
        let input = records(&[("CS101", 5), ("MA201", 1), ("CS101", 3), ("EN150", 2)]);
        let first = serde_json::to_string(&aggregate(&input)).unwrap();
        let second = serde_json::to_string(&aggregate(&input)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let stats = aggregate(&records(&[("CS101", 5)]));
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["totalCount"], 1);
        assert_eq!(value["averageRating"], 5.0);
        assert_eq!(value["ratingHistogram"]["5"], 1);
        assert_eq!(value["courseFrequency"]["CS101"], 1);
        assert_eq!(value["topCourses"][0]["courseCode"], "CS101");
    }
}
