//! Caching keys for storefront API reads.

use crate::cache::QueryKey;

use super::types::ProductFilter;

/// Query key types for storefront API reads.
///
/// Namespaces are chosen so write paths can clear related entries by
/// prefix: product mutations bust "products"/"product:", user mutations
/// bust "user:{id}:", and so on.
#[derive(Clone, Debug)]
pub enum StoreQueryKey {
  /// Product listing with filters
  ProductList { filter: ProductFilter },
  /// A single product by id
  Product { product_id: String },
  /// Trending products
  Trending { limit: u32 },
  /// Recommendations for a product
  Recommendations { product_id: String, limit: u32 },
  /// A session's cart
  Cart { session_id: String },
  /// A user profile
  User { user_id: String },
  /// A user's favorite products
  Favorites { user_id: String },
  /// Reviews for a product
  Reviews { product_id: String, limit: u32 },
  /// Review statistics for a product
  ReviewStats { product_id: String },
}

impl QueryKey for StoreQueryKey {
  fn namespace(&self) -> String {
    match self {
      Self::ProductList { .. } => "products".to_string(),
      Self::Product { product_id } => format!("product:{}", product_id),
      Self::Trending { .. } => "trending".to_string(),
      Self::Recommendations { product_id, .. } => format!("recommendations:{}", product_id),
      Self::Cart { session_id } => format!("cart:{}", session_id),
      Self::User { user_id } => format!("user:{}:profile", user_id),
      Self::Favorites { user_id } => format!("user:{}:favorites", user_id),
      Self::Reviews { product_id, .. } => format!("reviews:{}", product_id),
      Self::ReviewStats { product_id } => format!("review_stats:{}", product_id),
    }
  }

  fn params(&self) -> String {
    match self {
      Self::ProductList { filter } => filter_params(filter),
      Self::Trending { limit } => format!("limit={}", limit),
      Self::Recommendations { limit, .. } => format!("limit={}", limit),
      Self::Reviews { limit, .. } => format!("limit={}", limit),
      _ => String::new(),
    }
  }

  fn description(&self) -> String {
    match self {
      Self::ProductList { filter } => {
        if *filter == ProductFilter::default() {
          "all products".to_string()
        } else {
          format!("products ({})", filter_params(filter))
        }
      }
      Self::Product { product_id } => format!("product {}", product_id),
      Self::Trending { limit } => format!("top {} trending products", limit),
      Self::Recommendations { product_id, limit } => {
        format!("{} recommendations for product {}", limit, product_id)
      }
      Self::Cart { session_id } => format!("cart for session {}", session_id),
      Self::User { user_id } => format!("user {}", user_id),
      Self::Favorites { user_id } => format!("favorites of user {}", user_id),
      Self::Reviews { product_id, limit } => {
        format!("{} reviews for product {}", limit, product_id)
      }
      Self::ReviewStats { product_id } => format!("review stats for product {}", product_id),
    }
  }
}

/// Normalize a product filter into a deterministic parameter string.
///
/// Search terms are trimmed and lowercased so equivalent queries share a
/// cache entry.
fn filter_params(filter: &ProductFilter) -> String {
  format!(
    "category={}|type={}|featured={}|search={}|min={}|max={}|limit={}",
    filter.category.as_deref().unwrap_or(""),
    filter.product_type.as_deref().unwrap_or(""),
    filter.featured.map(|f| f.to_string()).unwrap_or_default(),
    filter
      .search
      .as_deref()
      .map(|s| s.trim().to_lowercase())
      .unwrap_or_default(),
    filter.min_price.map(|p| p.to_string()).unwrap_or_default(),
    filter.max_price.map(|p| p.to_string()).unwrap_or_default(),
    filter.limit.map(|l| l.to_string()).unwrap_or_default(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_keys_are_deterministic() {
    let filter = ProductFilter {
      category: Some("computers".to_string()),
      ..Default::default()
    };
    let a = StoreQueryKey::ProductList { filter: filter.clone() };
    let b = StoreQueryKey::ProductList { filter };
    assert_eq!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_distinct_filters_produce_distinct_keys() {
    let a = StoreQueryKey::ProductList {
      filter: ProductFilter {
        category: Some("computers".to_string()),
        ..Default::default()
      },
    };
    let b = StoreQueryKey::ProductList {
      filter: ProductFilter {
        category: Some("audio".to_string()),
        ..Default::default()
      },
    };
    assert_ne!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_equivalent_search_terms_share_a_key() {
    let a = StoreQueryKey::ProductList {
      filter: ProductFilter {
        search: Some("  Aurora ".to_string()),
        ..Default::default()
      },
    };
    let b = StoreQueryKey::ProductList {
      filter: ProductFilter {
        search: Some("aurora".to_string()),
        ..Default::default()
      },
    };
    assert_eq!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_parameterless_keys_expose_their_namespace() {
    let key = StoreQueryKey::Cart {
      session_id: "s1".to_string(),
    };
    assert_eq!(key.cache_key(), "cart:s1");

    let key = StoreQueryKey::Favorites {
      user_id: "u1".to_string(),
    };
    assert_eq!(key.cache_key(), "user:u1:favorites");
  }

  #[test]
  fn test_listing_keys_live_under_their_namespace() {
    let key = StoreQueryKey::ProductList {
      filter: ProductFilter::default(),
    };
    assert!(key.cache_key().starts_with("products:"));
  }
}
