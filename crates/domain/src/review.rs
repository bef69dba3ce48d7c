use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::review::ReviewRepository;
use crate::util::{now_ms, uuid_v7_without_dashes};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewSource {
    Kmong,
    Website,
}

impl ReviewSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewSource::Kmong => "KMONG",
            ReviewSource::Website => "WEBSITE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub member_id: Option<String>,
    pub rating: i32,
    pub content: String,
    pub source: ReviewSource,
    pub admin_reply: Option<String>,
    #[serde(rename = "repliedAt")]
    pub replied_at_ms: Option<i64>,
    pub is_visible: bool,
    #[serde(rename = "createdAt")]
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ReviewCreate {
    pub member_id: Option<String>,
    pub rating: i32,
    pub content: String,
    pub source: ReviewSource,
}

#[derive(Clone)]
pub struct ReviewService {
    repository: Arc<dyn ReviewRepository>,
}

impl ReviewService {
    pub fn new(repository: Arc<dyn ReviewRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> DomainResult<Vec<Review>> {
        self.repository.list().await
    }

    pub async fn submit(&self, input: ReviewCreate) -> DomainResult<Review> {
        if !(MIN_RATING..=MAX_RATING).contains(&input.rating) {
            return Err(DomainError::Validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
        let content = input.content.trim().to_string();
        if content.is_empty() {
            return Err(DomainError::Validation("content is required".into()));
        }
        let review = Review {
            id: uuid_v7_without_dashes(),
            member_id: input.member_id,
            rating: input.rating,
            content,
            source: input.source,
            admin_reply: None,
            replied_at_ms: None,
            is_visible: true,
            created_at_ms: now_ms(),
        };
        self.repository.create(&review).await
    }

    /// Attaches the staff reply and stamps the reply time.
    pub async fn reply(&self, review_id: &str, reply: &str) -> DomainResult<Review> {
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(DomainError::Validation("adminReply is required".into()));
        }
        let mut review = self
            .repository
            .get(review_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        review.admin_reply = Some(reply.to_string());
        review.replied_at_ms = Some(now_ms());
        self.repository.update(&review).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::BoxFuture;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct MockReviewRepo {
        rows: Arc<RwLock<HashMap<String, Review>>>,
    }

    impl ReviewRepository for MockReviewRepo {
        fn list(&self) -> BoxFuture<'_, DomainResult<Vec<Review>>> {
            let rows = self.rows.clone();
            Box::pin(async move {
                let mut reviews: Vec<_> = rows.read().await.values().cloned().collect();
                reviews.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
                Ok(reviews)
            })
        }

        fn get(&self, review_id: &str) -> BoxFuture<'_, DomainResult<Option<Review>>> {
            let review_id = review_id.to_string();
            let rows = self.rows.clone();
            Box::pin(async move { Ok(rows.read().await.get(&review_id).cloned()) })
        }

        fn create(&self, review: &Review) -> BoxFuture<'_, DomainResult<Review>> {
            let review = review.clone();
            let rows = self.rows.clone();
            Box::pin(async move {
                rows.write().await.insert(review.id.clone(), review.clone());
                Ok(review)
            })
        }

        fn update(&self, review: &Review) -> BoxFuture<'_, DomainResult<Review>> {
            let review = review.clone();
            let rows = self.rows.clone();
            Box::pin(async move {
                let mut rows = rows.write().await;
                if !rows.contains_key(&review.id) {
                    return Err(DomainError::NotFound);
                }
                rows.insert(review.id.clone(), review.clone());
                Ok(review)
            })
        }

        fn average_visible_rating(&self) -> BoxFuture<'_, DomainResult<Option<f64>>> {
            let rows = self.rows.clone();
            Box::pin(async move {
                let rows = rows.read().await;
                let visible: Vec<_> = rows.values().filter(|r| r.is_visible).collect();
                if visible.is_empty() {
                    return Ok(None);
                }
                let sum: i32 = visible.iter().map(|r| r.rating).sum();
                Ok(Some(f64::from(sum) / visible.len() as f64))
            })
        }
    }

    #[tokio::test]
    async fn submit_rejects_out_of_range_rating() {
        let service = ReviewService::new(Arc::new(MockReviewRepo::default()));
        for rating in [0, 6, -1] {
            let result = service
                .submit(ReviewCreate {
                    member_id: None,
                    rating,
                    content: "great work".to_string(),
                    source: ReviewSource::Website,
                })
                .await;
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn reply_stamps_time_and_persists() {
        let service = ReviewService::new(Arc::new(MockReviewRepo::default()));
        let review = service
            .submit(ReviewCreate {
                member_id: Some("m-1".to_string()),
                rating: 5,
                content: "fast delivery".to_string(),
                source: ReviewSource::Kmong,
            })
            .await
            .expect("submit");

        let replied = service.reply(&review.id, "thank you!").await.expect("reply");
        assert_eq!(replied.admin_reply.as_deref(), Some("thank you!"));
        assert!(replied.replied_at_ms.is_some());
    }

    #[tokio::test]
    async fn reply_to_unknown_review_is_not_found() {
        let service = ReviewService::new(Arc::new(MockReviewRepo::default()));
        let result = service.reply("missing", "hello").await;
        assert!(matches!(result, Err(DomainError::NotFound)));
    }
}
