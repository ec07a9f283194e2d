//! Cached storefront client wrapping [`StoreClient`] with transparent
//! caching.

use chrono::Duration;
use tracing::debug;

use crate::cache::{CacheLayer, CacheStats, FetchOptions, KeyValueStore, QueryKey};

use super::cache::StoreQueryKey;
use super::client::StoreClient;
use super::error::ApiError;
use super::types::{
  Cart, CartItemAdd, NewProduct, NewReview, NewUser, Product, ProductFilter, ProductPatch,
  Review, ReviewStats, User,
};

/// TTL override for individual product lookups (10 minutes).
/// Single products change less often than listings.
const PRODUCT_DETAIL_TTL_MS: i64 = 600_000;

/// Storefront client with transparent caching.
///
/// Reads go through the cache layer and only reach the network on a miss;
/// writes always go to the network and then invalidate the namespaces they
/// touched.
pub struct CachedStoreClient<S: KeyValueStore> {
  inner: StoreClient,
  cache: CacheLayer<S>,
}

impl<S: KeyValueStore> Clone for CachedStoreClient<S> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
      cache: self.cache.clone(),
    }
  }
}

impl<S: KeyValueStore> CachedStoreClient<S> {
  /// Wrap a client with a cache layer.
  pub fn new(inner: StoreClient, cache: CacheLayer<S>) -> Self {
    Self { inner, cache }
  }

  /// The underlying cache layer, for manual busting and stats.
  pub fn cache(&self) -> &CacheLayer<S> {
    &self.cache
  }

  // ===== Products =====

  /// List products with optional filtering and search, cached.
  pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
    let key = StoreQueryKey::ProductList {
      filter: filter.clone(),
    };

    let result = self
      .cache
      .fetch(&key.cache_key(), || {
        let inner = self.inner.clone();
        let filter = filter.clone();
        async move { inner.list_products(&filter).await }
      })
      .await?;

    debug!(query = %key.description(), source = ?result.source, "products fetched");
    Ok(result.data)
  }

  /// Get a single product by id, cached with a longer TTL.
  pub async fn get_product(&self, product_id: &str) -> Result<Product, ApiError> {
    let key = StoreQueryKey::Product {
      product_id: product_id.to_string(),
    };

    let result = self
      .cache
      .fetch_with(
        &key.cache_key(),
        FetchOptions {
          ttl: Some(Duration::milliseconds(PRODUCT_DETAIL_TTL_MS)),
          enabled: None,
        },
        || {
          let inner = self.inner.clone();
          let product_id = product_id.to_string();
          async move { inner.get_product(&product_id).await }
        },
      )
      .await?;

    Ok(result.data)
  }

  /// Invalidate then fetch a product listing, forcing a live retrieval.
  pub async fn refetch_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
    let key = StoreQueryKey::ProductList {
      filter: filter.clone(),
    };

    let result = self
      .cache
      .refetch(&key.cache_key(), || {
        let inner = self.inner.clone();
        let filter = filter.clone();
        async move { inner.list_products(&filter).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Create a product and bust the product caches.
  pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
    let created = self.inner.create_product(product).await?;
    self.invalidate_products();
    Ok(created)
  }

  /// Update a product and bust the product caches.
  pub async fn update_product(
    &self,
    product_id: &str,
    patch: &ProductPatch,
  ) -> Result<Product, ApiError> {
    let updated = self.inner.update_product(product_id, patch).await?;
    self.invalidate_products();
    Ok(updated)
  }

  /// Delete a product and bust the product caches.
  pub async fn delete_product(&self, product_id: &str) -> Result<(), ApiError> {
    self.inner.delete_product(product_id).await?;
    self.invalidate_products();
    Ok(())
  }

  /// Trending products, cached.
  pub async fn trending_products(&self, limit: u32) -> Result<Vec<Product>, ApiError> {
    let key = StoreQueryKey::Trending { limit };

    let result = self
      .cache
      .fetch(&key.cache_key(), || {
        let inner = self.inner.clone();
        async move { inner.trending_products(limit).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Recommendations for a product, cached.
  pub async fn recommendations(
    &self,
    product_id: &str,
    limit: u32,
  ) -> Result<Vec<Product>, ApiError> {
    let key = StoreQueryKey::Recommendations {
      product_id: product_id.to_string(),
      limit,
    };

    let result = self
      .cache
      .fetch(&key.cache_key(), || {
        let inner = self.inner.clone();
        let product_id = product_id.to_string();
        async move { inner.recommendations(&product_id, limit).await }
      })
      .await?;

    Ok(result.data)
  }

  // ===== Cart =====

  /// Get a session's cart, cached.
  pub async fn get_cart(&self, session_id: &str) -> Result<Cart, ApiError> {
    let key = StoreQueryKey::Cart {
      session_id: session_id.to_string(),
    };

    let result = self
      .cache
      .fetch(&key.cache_key(), || {
        let inner = self.inner.clone();
        let session_id = session_id.to_string();
        async move { inner.get_cart(&session_id).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Add an item to a session's cart and bust the cached cart.
  pub async fn add_cart_item(
    &self,
    session_id: &str,
    item: &CartItemAdd,
  ) -> Result<Cart, ApiError> {
    let cart = self.inner.add_cart_item(session_id, item).await?;
    self.invalidate_cart(session_id);
    Ok(cart)
  }

  /// Remove an item from a session's cart and bust the cached cart.
  pub async fn remove_cart_item(&self, session_id: &str, item_id: &str) -> Result<(), ApiError> {
    self.inner.remove_cart_item(session_id, item_id).await?;
    self.invalidate_cart(session_id);
    Ok(())
  }

  /// Clear a session's cart and bust the cached cart.
  pub async fn clear_cart(&self, session_id: &str) -> Result<(), ApiError> {
    self.inner.clear_cart(session_id).await?;
    self.invalidate_cart(session_id);
    Ok(())
  }

  // ===== Users =====

  /// Create a user. Nothing is cached for a brand-new user.
  pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
    self.inner.create_user(user).await
  }

  /// Get a user by id, cached.
  pub async fn get_user(&self, user_id: &str) -> Result<User, ApiError> {
    let key = StoreQueryKey::User {
      user_id: user_id.to_string(),
    };

    let result = self
      .cache
      .fetch(&key.cache_key(), || {
        let inner = self.inner.clone();
        let user_id = user_id.to_string();
        async move { inner.get_user(&user_id).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Mark a product as a favorite and bust the user's cached entries.
  pub async fn add_favorite(&self, user_id: &str, product_id: &str) -> Result<(), ApiError> {
    self.inner.add_favorite(user_id, product_id).await?;
    self.invalidate_user(user_id);
    Ok(())
  }

  /// Remove a favorite and bust the user's cached entries.
  pub async fn remove_favorite(&self, user_id: &str, product_id: &str) -> Result<(), ApiError> {
    self.inner.remove_favorite(user_id, product_id).await?;
    self.invalidate_user(user_id);
    Ok(())
  }

  /// The user's favorite products, cached.
  pub async fn user_favorites(&self, user_id: &str) -> Result<Vec<Product>, ApiError> {
    let key = StoreQueryKey::Favorites {
      user_id: user_id.to_string(),
    };

    let result = self
      .cache
      .fetch(&key.cache_key(), || {
        let inner = self.inner.clone();
        let user_id = user_id.to_string();
        async move { inner.user_favorites(&user_id).await }
      })
      .await?;

    Ok(result.data)
  }

  // ===== Reviews =====

  /// Create a review and bust the product's cached reviews and stats.
  pub async fn create_review(&self, review: &NewReview) -> Result<Review, ApiError> {
    let created = self.inner.create_review(review).await?;
    self
      .cache
      .invalidate_prefix(&format!("reviews:{}", review.product_id));
    self
      .cache
      .invalidate(&format!("review_stats:{}", review.product_id));
    Ok(created)
  }

  /// Reviews for a product, cached.
  pub async fn product_reviews(
    &self,
    product_id: &str,
    limit: u32,
  ) -> Result<Vec<Review>, ApiError> {
    let key = StoreQueryKey::Reviews {
      product_id: product_id.to_string(),
      limit,
    };

    let result = self
      .cache
      .fetch(&key.cache_key(), || {
        let inner = self.inner.clone();
        let product_id = product_id.to_string();
        async move { inner.product_reviews(&product_id, limit).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Aggregated review statistics for a product, cached.
  pub async fn review_stats(&self, product_id: &str) -> Result<ReviewStats, ApiError> {
    let key = StoreQueryKey::ReviewStats {
      product_id: product_id.to_string(),
    };

    let result = self
      .cache
      .fetch(&key.cache_key(), || {
        let inner = self.inner.clone();
        let product_id = product_id.to_string();
        async move { inner.review_stats(&product_id).await }
      })
      .await?;

    Ok(result.data)
  }

  // ===== Invalidation =====

  /// Drop every product-derived cache entry (listings, details, trending,
  /// recommendations). Returns the number of entries removed.
  pub fn invalidate_products(&self) -> usize {
    self.cache.invalidate_prefix("products")
      + self.cache.invalidate_prefix("product:")
      + self.cache.invalidate_prefix("trending")
      + self.cache.invalidate_prefix("recommendations:")
  }

  /// Drop the cache entries belonging to one user.
  pub fn invalidate_user(&self, user_id: &str) -> usize {
    self.cache.invalidate_prefix(&format!("user:{}:", user_id))
  }

  /// Drop the cached cart for one session.
  pub fn invalidate_cart(&self, session_id: &str) -> bool {
    let key = StoreQueryKey::Cart {
      session_id: session_id.to_string(),
    };
    self.cache.invalidate(&key.cache_key())
  }

  /// Drop every cache entry this client ever wrote.
  pub fn clear_cache(&self) -> usize {
    self.cache.invalidate_prefix("")
  }

  /// Snapshot of cache counters and store usage.
  pub fn stats(&self) -> CacheStats {
    self.cache.stats()
  }
}
