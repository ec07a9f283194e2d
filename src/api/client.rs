//! HTTP client for the storefront REST API.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

use super::error::ApiError;
use super::types::{
  Cart, CartItemAdd, NewProduct, NewReview, NewUser, Product, ProductFilter, ProductPatch,
  Review, ReviewStats, User,
};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the storefront REST API.
///
/// Clone is cheap - reqwest::Client shares its connection pool internally.
#[derive(Clone)]
pub struct StoreClient {
  client: Client,
  base_url: String,
}

/// Cart mutation responses wrap the cart in a message envelope.
#[derive(Debug, Deserialize)]
struct CartEnvelope {
  cart: Cart,
}

impl StoreClient {
  /// Create a client for the API at `base_url` (e.g.
  /// "http://localhost:8000/api").
  pub fn new(base_url: &str) -> Result<Self, ApiError> {
    // Parse up front so a bad URL fails at construction, not per request
    let parsed = Url::parse(base_url)?;

    let client = Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .build()?;

    Ok(Self {
      client,
      base_url: parsed.as_str().trim_end_matches('/').to_string(),
    })
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path)
  }

  async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(ApiError::from_status(status, &body));
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
  }

  async fn expect_success(response: Response) -> Result<(), ApiError> {
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(ApiError::from_status(status, &body));
    }
    Ok(())
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T, ApiError> {
    let mut request = self.client.get(self.endpoint(path));
    if !query.is_empty() {
      request = request.query(query);
    }
    Self::parse(request.send().await?).await
  }

  async fn post_json<B: Serialize, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, ApiError> {
    let response = self.client.post(self.endpoint(path)).json(body).send().await?;
    Self::parse(response).await
  }

  async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
    let response = self.client.post(self.endpoint(path)).send().await?;
    Self::expect_success(response).await
  }

  async fn put_json<B: Serialize, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, ApiError> {
    let response = self.client.put(self.endpoint(path)).json(body).send().await?;
    Self::parse(response).await
  }

  async fn delete(&self, path: &str) -> Result<(), ApiError> {
    let response = self.client.delete(self.endpoint(path)).send().await?;
    Self::expect_success(response).await
  }

  // ===== Products =====

  /// List products with optional filtering and search.
  pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ApiError> {
    self.get_json("products", &filter.to_query()).await
  }

  /// Get a single product by id.
  pub async fn get_product(&self, product_id: &str) -> Result<Product, ApiError> {
    self.get_json(&format!("products/{}", product_id), &[]).await
  }

  /// Create a product.
  pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
    self.post_json("products", product).await
  }

  /// Update an existing product; unset patch fields are left untouched.
  pub async fn update_product(
    &self,
    product_id: &str,
    patch: &ProductPatch,
  ) -> Result<Product, ApiError> {
    self.put_json(&format!("products/{}", product_id), patch).await
  }

  /// Delete a product.
  pub async fn delete_product(&self, product_id: &str) -> Result<(), ApiError> {
    self.delete(&format!("products/{}", product_id)).await
  }

  /// Products trending by recent reviews and featured status.
  pub async fn trending_products(&self, limit: u32) -> Result<Vec<Product>, ApiError> {
    self
      .get_json("products/trending", &[("limit", limit.to_string())])
      .await
  }

  /// Products similar to `product_id` by category and price range.
  pub async fn recommendations(
    &self,
    product_id: &str,
    limit: u32,
  ) -> Result<Vec<Product>, ApiError> {
    self
      .get_json(
        &format!("products/{}/recommendations", product_id),
        &[("limit", limit.to_string())],
      )
      .await
  }

  // ===== Cart =====

  /// Get the cart for a session; the server creates one if absent.
  pub async fn get_cart(&self, session_id: &str) -> Result<Cart, ApiError> {
    self.get_json(&format!("cart/{}", session_id), &[]).await
  }

  /// Add an item to a session's cart, returning the updated cart.
  pub async fn add_cart_item(
    &self,
    session_id: &str,
    item: &CartItemAdd,
  ) -> Result<Cart, ApiError> {
    let envelope: CartEnvelope = self
      .post_json(&format!("cart/{}/items", session_id), item)
      .await?;
    Ok(envelope.cart)
  }

  /// Remove an item from a session's cart.
  pub async fn remove_cart_item(&self, session_id: &str, item_id: &str) -> Result<(), ApiError> {
    self
      .delete(&format!("cart/{}/items/{}", session_id, item_id))
      .await
  }

  /// Remove every item from a session's cart.
  pub async fn clear_cart(&self, session_id: &str) -> Result<(), ApiError> {
    self.delete(&format!("cart/{}", session_id)).await
  }

  // ===== Users =====

  /// Create a user.
  pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
    self.post_json("users", user).await
  }

  /// Get a user by id.
  pub async fn get_user(&self, user_id: &str) -> Result<User, ApiError> {
    self.get_json(&format!("users/{}", user_id), &[]).await
  }

  /// Mark a product as one of the user's favorites.
  pub async fn add_favorite(&self, user_id: &str, product_id: &str) -> Result<(), ApiError> {
    self
      .post_empty(&format!("users/{}/favorites/{}", user_id, product_id))
      .await
  }

  /// Remove a product from the user's favorites.
  pub async fn remove_favorite(&self, user_id: &str, product_id: &str) -> Result<(), ApiError> {
    self
      .delete(&format!("users/{}/favorites/{}", user_id, product_id))
      .await
  }

  /// The user's favorite products, resolved to full records.
  pub async fn user_favorites(&self, user_id: &str) -> Result<Vec<Product>, ApiError> {
    self.get_json(&format!("users/{}/favorites", user_id), &[]).await
  }

  // ===== Reviews =====

  /// Create a review; the server rejects duplicate reviews per user and
  /// product.
  pub async fn create_review(&self, review: &NewReview) -> Result<Review, ApiError> {
    self.post_json("reviews", review).await
  }

  /// Reviews for a product, newest first.
  pub async fn product_reviews(
    &self,
    product_id: &str,
    limit: u32,
  ) -> Result<Vec<Review>, ApiError> {
    self
      .get_json(
        &format!("reviews/product/{}", product_id),
        &[("limit", limit.to_string())],
      )
      .await
  }

  /// Aggregated review statistics for a product.
  pub async fn review_stats(&self, product_id: &str) -> Result<ReviewStats, ApiError> {
    self.get_json(&format!("reviews/stats/{}", product_id), &[]).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_base_url_is_normalized() {
    let client = StoreClient::new("http://localhost:8000/api/").unwrap();
    assert_eq!(client.endpoint("products"), "http://localhost:8000/api/products");
  }

  #[test]
  fn test_invalid_base_url_is_rejected() {
    assert!(matches!(
      StoreClient::new("not a url"),
      Err(ApiError::BaseUrl(_))
    ));
  }
}
