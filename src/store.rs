use std::future::Future;

use thiserror::Error;

use crate::models::{FeedbackRecord, ValidFeedback};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Feedback {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Handle to the record store. Opened once at start-up and shared by every
/// request; implementations must be cheap to clone.
pub trait FeedbackStore: Clone + Send + Sync + 'static {
    /// All records, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<FeedbackRecord>, StoreError>> + Send;

    fn create(
        &self,
        feedback: ValidFeedback,
    ) -> impl Future<Output = Result<FeedbackRecord, StoreError>> + Send;

    fn delete(&self, id: i64) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn health(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[cfg(test)]
pub mod memory {
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, Utc};

    use super::{FeedbackStore, StoreError};
    use crate::models::{FeedbackRecord, ValidFeedback};

    #[derive(Default)]
    struct Inner {
        records: Vec<FeedbackRecord>,
        next_id: i64,
        offline: bool,
    }

    /// Vec-backed store for router tests. `set_offline` makes every call fail
    /// the way an unreachable database would.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        inner: Arc<Mutex<Inner>>,
    }

    impl MemoryStore {
        pub fn set_offline(&self, offline: bool) {
            self.inner.lock().unwrap().offline = offline;
        }

        pub fn len(&self) -> usize {
            self.inner.lock().unwrap().records.len()
        }

        fn check_online(inner: &Inner) -> Result<(), StoreError> {
            if inner.offline {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(())
        }
    }

    impl FeedbackStore for MemoryStore {
        async fn list(&self) -> Result<Vec<FeedbackRecord>, StoreError> {
            let inner = self.inner.lock().unwrap();
            Self::check_online(&inner)?;

            let mut records = inner.records.clone();
            records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(records)
        }

        async fn create(&self, feedback: ValidFeedback) -> Result<FeedbackRecord, StoreError> {
            let mut inner = self.inner.lock().unwrap();
            Self::check_online(&inner)?;

            inner.next_id += 1;
            let record = FeedbackRecord {
                id: inner.next_id,
                student_name: feedback.student_name,
                course_code: feedback.course_code,
                comments: feedback.comments,
                rating: feedback.rating,
                // strictly increasing so ordering by time is deterministic
                created_at: Utc::now() + Duration::milliseconds(inner.next_id),
            };
            inner.records.push(record.clone());
            Ok(record)
        }

        async fn delete(&self, id: i64) -> Result<(), StoreError> {
            let mut inner = self.inner.lock().unwrap();
            Self::check_online(&inner)?;

            let before = inner.records.len();
            inner.records.retain(|record| record.id != id);
            if inner.records.len() == before {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        }

        async fn health(&self) -> Result<(), StoreError> {
            let inner = self.inner.lock().unwrap();
            Self::check_online(&inner)
        }
    }
}
