//! Typed models for the storefront REST API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
  pub id: String,
  pub name: String,
  pub description: String,
  pub price: f64,
  pub category: String,
  /// Product family, e.g. "laptop", "phone", "headphones", "watch"
  pub product_type: String,
  #[serde(default)]
  pub colors: Vec<String>,
  #[serde(default)]
  pub model_url: Option<String>,
  #[serde(default)]
  pub images: Vec<String>,
  #[serde(default)]
  pub stock: u32,
  #[serde(default)]
  pub featured: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Payload for creating a product.
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
  pub name: String,
  pub description: String,
  pub price: f64,
  pub category: String,
  pub product_type: String,
  pub colors: Vec<String>,
  pub model_url: Option<String>,
  pub images: Vec<String>,
  pub stock: u32,
  pub featured: bool,
}

/// Partial update for a product; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub product_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub colors: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub images: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stock: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub featured: Option<bool>,
}

/// Server-side filtering and search options for product listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
  pub category: Option<String>,
  pub product_type: Option<String>,
  pub featured: Option<bool>,
  pub search: Option<String>,
  pub min_price: Option<f64>,
  pub max_price: Option<f64>,
  /// Maximum number of results; the server defaults to 50
  pub limit: Option<u32>,
}

impl ProductFilter {
  /// Render the filter as URL query parameters, omitting unset fields.
  pub fn to_query(&self) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(category) = &self.category {
      query.push(("category", category.clone()));
    }
    if let Some(product_type) = &self.product_type {
      query.push(("product_type", product_type.clone()));
    }
    if let Some(featured) = self.featured {
      query.push(("featured", featured.to_string()));
    }
    if let Some(search) = &self.search {
      query.push(("search", search.clone()));
    }
    if let Some(min_price) = self.min_price {
      query.push(("min_price", min_price.to_string()));
    }
    if let Some(max_price) = self.max_price {
      query.push(("max_price", max_price.to_string()));
    }
    if let Some(limit) = self.limit {
      query.push(("limit", limit.to_string()));
    }
    query
  }
}

/// A line item inside a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
  pub id: String,
  pub product_id: String,
  pub quantity: u32,
  pub selected_color: String,
  pub added_at: DateTime<Utc>,
}

/// A shopping cart, tracked per guest session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
  pub id: String,
  #[serde(default)]
  pub user_id: Option<String>,
  pub session_id: String,
  #[serde(default)]
  pub items: Vec<CartItem>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Payload for adding an item to a cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemAdd {
  pub product_id: String,
  pub quantity: u32,
  pub selected_color: String,
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub email: String,
  pub name: String,
  #[serde(default)]
  pub phone: Option<String>,
  #[serde(default)]
  pub address: Option<String>,
  /// Product ids the user marked as favorites
  #[serde(default)]
  pub favorites: Vec<String>,
  pub created_at: DateTime<Utc>,
}

/// Payload for creating a user.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
  pub email: String,
  pub name: String,
  pub phone: Option<String>,
  pub address: Option<String>,
}

/// A product review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
  pub id: String,
  pub product_id: String,
  pub user_id: String,
  pub user_name: String,
  /// 1-5 stars
  pub rating: u8,
  pub comment: String,
  pub created_at: DateTime<Utc>,
}

/// Payload for creating a review.
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
  pub product_id: String,
  pub user_id: String,
  pub user_name: String,
  pub rating: u8,
  pub comment: String,
}

/// Aggregated review statistics for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewStats {
  pub total_reviews: u64,
  pub average_rating: f64,
  /// Review count per star rating (1 through 5)
  pub rating_distribution: BTreeMap<u8, u64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_product_deserializes_with_optional_fields_absent() {
    let raw = r#"{
      "id": "p1",
      "name": "Aurora Laptop",
      "description": "Thin and light",
      "price": 1299.0,
      "category": "computers",
      "product_type": "laptop",
      "created_at": "2026-01-05T12:00:00Z",
      "updated_at": "2026-01-06T08:30:00Z"
    }"#;

    let product: Product = serde_json::from_str(raw).unwrap();
    assert_eq!(product.id, "p1");
    assert!(product.colors.is_empty());
    assert_eq!(product.model_url, None);
    assert_eq!(product.stock, 0);
    assert!(!product.featured);
  }

  #[test]
  fn test_product_patch_skips_unset_fields() {
    let patch = ProductPatch {
      price: Some(999.0),
      ..Default::default()
    };

    let raw = serde_json::to_string(&patch).unwrap();
    assert_eq!(raw, r#"{"price":999.0}"#);
  }

  #[test]
  fn test_filter_query_omits_unset_fields() {
    let filter = ProductFilter {
      category: Some("computers".to_string()),
      limit: Some(10),
      ..Default::default()
    };

    let query = filter.to_query();
    assert_eq!(
      query,
      vec![("category", "computers".to_string()), ("limit", "10".to_string())]
    );
  }

  #[test]
  fn test_review_stats_roundtrip() {
    let raw = r#"{
      "total_reviews": 3,
      "average_rating": 4.3,
      "rating_distribution": {"1": 0, "2": 0, "3": 1, "4": 0, "5": 2}
    }"#;

    let stats: ReviewStats = serde_json::from_str(raw).unwrap();
    assert_eq!(stats.total_reviews, 3);
    assert_eq!(stats.rating_distribution.get(&5), Some(&2));
  }
}
