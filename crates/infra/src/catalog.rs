//! Catalog service: product lookup and the review read/write path.

use std::sync::Arc;

use tracing::instrument;

use storefront_catalog::{NewReview, Product, Review};
use storefront_core::{DomainError, ProductId, ReviewId};

use crate::error::ServiceResult;
use crate::store::Storage;

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn Storage>,
}

impl Catalog {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Every product, ordered by id.
    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    #[instrument(skip(self), err(level = "debug"))]
    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id).into())
    }

    /// Current stock outside any transaction. The order engine reads stock
    /// through its own transaction instead.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn get_stock(&self, id: ProductId) -> ServiceResult<i32> {
        self.store
            .get_stock(id)
            .await?
            .ok_or_else(|| DomainError::not_found("product", id).into())
    }

    #[instrument(skip(self), err(level = "debug"))]
    pub async fn list_reviews(&self, product_id: ProductId) -> ServiceResult<Vec<Review>> {
        self.get_product(product_id).await?;
        Ok(self.store.reviews_for_product(product_id).await?)
    }

    #[instrument(
        skip(self, review),
        fields(product_id = %review.product_id(), user_id = %review.user_id()),
        err(level = "debug")
    )]
    pub async fn add_review(&self, review: NewReview) -> ServiceResult<ReviewId> {
        self.get_product(review.product_id()).await?;
        if !self.store.user_exists(review.user_id()).await? {
            return Err(DomainError::not_found("user", review.user_id()).into());
        }
        Ok(self.store.insert_review(&review).await?)
    }
}
