use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, ProductId, ReviewId, UserId};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

/// A stored product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Entity for Review {
    type Id = ReviewId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// A validated review submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    product_id: ProductId,
    user_id: UserId,
    rating: i32,
    comment: Option<String>,
}

impl NewReview {
    /// Validates the rating range; a blank comment is stored as no comment.
    pub fn new(
        product_id: ProductId,
        user_id: UserId,
        rating: i32,
        comment: Option<String>,
    ) -> DomainResult<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(DomainError::invalid(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
            )));
        }
        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(Self {
            product_id,
            user_id,
            rating,
            comment,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn rating(&self) -> i32 {
        self.rating
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}
