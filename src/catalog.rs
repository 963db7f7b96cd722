//! Product catalog: product-information queries and the cached product list.

use crate::billing::{BillingApi, Product};
use crate::UnlockgateError;
use std::sync::{Arc, Mutex};

/// Classified outcome of one product query.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogOutcome {
    /// Every requested identifier resolved to a product.
    Found(Vec<Product>),
    /// No identifier resolved; all were rejected.
    InvalidIdentifiers(Vec<String>),
    /// Some identifiers resolved, some were rejected.
    Mixed {
        /// Products the store recognized.
        products: Vec<Product>,
        /// Identifiers the store rejected.
        invalid_ids: Vec<String>,
    },
}

impl CatalogOutcome {
    /// Products carried by this outcome, if any.
    pub fn products(&self) -> &[Product] {
        match self {
            CatalogOutcome::Found(products) => products,
            CatalogOutcome::Mixed { products, .. } => products,
            CatalogOutcome::InvalidIdentifiers(_) => &[],
        }
    }
}

/// Issues product queries and caches the last completed result.
///
/// Each call is one independent platform request; there is no internal
/// queueing. The cached list is replaced wholesale by the last *completed*
/// query (a failed or empty query leaves it untouched).
pub struct ProductCatalog<B: BillingApi> {
    billing: Arc<B>,
    cached: Mutex<Vec<Product>>,
}

impl<B: BillingApi> ProductCatalog<B> {
    /// Create a catalog over the given billing API.
    pub fn new(billing: Arc<B>) -> Self {
        Self {
            billing,
            cached: Mutex::new(Vec::new()),
        }
    }

    /// Query product information for a set of identifiers.
    ///
    /// # Errors
    /// - `ProductNotFound` - the store returned neither products nor
    ///   invalid identifiers (empty response)
    /// - anything the billing transport reports
    pub fn query(&self, ids: &[String]) -> Result<CatalogOutcome, UnlockgateError> {
        let response = self.billing.query_products(ids)?;

        tracing::debug!(
            products = response.products.len(),
            invalid = response.invalid_ids.len(),
            "received product response"
        );

        if response.products.is_empty() && response.invalid_ids.is_empty() {
            return Err(UnlockgateError::ProductNotFound);
        }

        // Last completed query replaces the cache, no merge across calls.
        *self.cached.lock().expect("catalog lock poisoned") = response.products.clone();

        if response.invalid_ids.is_empty() {
            Ok(CatalogOutcome::Found(response.products))
        } else if response.products.is_empty() {
            Ok(CatalogOutcome::InvalidIdentifiers(response.invalid_ids))
        } else {
            Ok(CatalogOutcome::Mixed {
                products: response.products,
                invalid_ids: response.invalid_ids,
            })
        }
    }

    /// Snapshot of the last completed query's products.
    pub fn products(&self) -> Vec<Product> {
        self.cached.lock().expect("catalog lock poisoned").clone()
    }

    /// Localized title for a cached product, if present.
    pub fn title_matching(&self, product_id: &str) -> Option<String> {
        self.cached
            .lock()
            .expect("catalog lock poisoned")
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.title.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{DownloadHandle, ProductQueryResponse};
    use std::sync::Mutex as StdMutex;

    struct ScriptedBilling {
        responses: StdMutex<Vec<Result<ProductQueryResponse, UnlockgateError>>>,
    }

    impl ScriptedBilling {
        fn new(responses: Vec<Result<ProductQueryResponse, UnlockgateError>>) -> Self {
            Self {
                responses: StdMutex::new(responses),
            }
        }
    }

    impl BillingApi for ScriptedBilling {
        fn can_make_payments(&self) -> bool {
            true
        }

        fn query_products(
            &self,
            _ids: &[String],
        ) -> Result<ProductQueryResponse, UnlockgateError> {
            self.responses.lock().unwrap().remove(0)
        }

        fn add_payment(&self, _product: &Product) -> Result<(), UnlockgateError> {
            Ok(())
        }

        fn restore_completed_transactions(&self) -> Result<(), UnlockgateError> {
            Ok(())
        }

        fn finish_transaction(&self, _transaction_id: &str) -> Result<(), UnlockgateError> {
            Ok(())
        }

        fn start_downloads(&self, _downloads: &[DownloadHandle]) -> Result<(), UnlockgateError> {
            Ok(())
        }

        fn resume_download(&self, _download: &DownloadHandle) -> Result<(), UnlockgateError> {
            Ok(())
        }
    }

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            title: format!("{} title", id),
            description: String::new(),
            price: 0.99,
            price_locale: "en_US".to_string(),
        }
    }

    #[test]
    fn all_valid_ids_yield_found() {
        let billing = Arc::new(ScriptedBilling::new(vec![Ok(ProductQueryResponse {
            products: vec![product("unlock")],
            invalid_ids: vec![],
        })]));
        let catalog = ProductCatalog::new(billing);

        let outcome = catalog.query(&["unlock".to_string()]).unwrap();
        assert!(matches!(outcome, CatalogOutcome::Found(ref p) if p.len() == 1));
    }

    #[test]
    fn mixed_response_reports_both_lists() {
        let billing = Arc::new(ScriptedBilling::new(vec![Ok(ProductQueryResponse {
            products: vec![product("unlock")],
            invalid_ids: vec!["bogus".to_string()],
        })]));
        let catalog = ProductCatalog::new(billing);

        let outcome = catalog
            .query(&["unlock".to_string(), "bogus".to_string()])
            .unwrap();
        match outcome {
            CatalogOutcome::Mixed {
                products,
                invalid_ids,
            } => {
                assert_eq!(products[0].id, "unlock");
                assert_eq!(invalid_ids, vec!["bogus".to_string()]);
            }
            other => panic!("expected mixed, got {:?}", other),
        }
    }

    #[test]
    fn only_invalid_ids_yield_invalid_identifiers() {
        let billing = Arc::new(ScriptedBilling::new(vec![Ok(ProductQueryResponse {
            products: vec![],
            invalid_ids: vec!["bogus".to_string()],
        })]));
        let catalog = ProductCatalog::new(billing);

        let outcome = catalog.query(&["bogus".to_string()]).unwrap();
        assert_eq!(
            outcome,
            CatalogOutcome::InvalidIdentifiers(vec!["bogus".to_string()])
        );
    }

    #[test]
    fn empty_response_is_product_not_found() {
        let billing = Arc::new(ScriptedBilling::new(vec![Ok(
            ProductQueryResponse::default(),
        )]));
        let catalog = ProductCatalog::new(billing);

        let result = catalog.query(&["unlock".to_string()]);
        assert!(matches!(result, Err(UnlockgateError::ProductNotFound)));
    }

    #[test]
    fn completed_query_replaces_cache_wholesale() {
        let billing = Arc::new(ScriptedBilling::new(vec![
            Ok(ProductQueryResponse {
                products: vec![product("first")],
                invalid_ids: vec![],
            }),
            Ok(ProductQueryResponse {
                products: vec![product("second")],
                invalid_ids: vec![],
            }),
        ]));
        let catalog = ProductCatalog::new(billing);

        catalog.query(&["first".to_string()]).unwrap();
        assert!(catalog.title_matching("first").is_some());

        catalog.query(&["second".to_string()]).unwrap();
        assert!(catalog.title_matching("first").is_none());
        assert_eq!(
            catalog.title_matching("second"),
            Some("second title".to_string())
        );
    }

    #[test]
    fn empty_response_keeps_previous_cache() {
        let billing = Arc::new(ScriptedBilling::new(vec![
            Ok(ProductQueryResponse {
                products: vec![product("unlock")],
                invalid_ids: vec![],
            }),
            Ok(ProductQueryResponse::default()),
        ]));
        let catalog = ProductCatalog::new(billing);

        catalog.query(&["unlock".to_string()]).unwrap();
        let result = catalog.query(&["unlock".to_string()]);
        assert!(matches!(result, Err(UnlockgateError::ProductNotFound)));
        assert_eq!(catalog.products().len(), 1);
    }

    #[test]
    fn failed_query_keeps_previous_cache() {
        let billing = Arc::new(ScriptedBilling::new(vec![
            Ok(ProductQueryResponse {
                products: vec![product("unlock")],
                invalid_ids: vec![],
            }),
            Err(UnlockgateError::NetworkFailure("offline".to_string())),
        ]));
        let catalog = ProductCatalog::new(billing);

        catalog.query(&["unlock".to_string()]).unwrap();
        assert!(catalog.query(&["unlock".to_string()]).is_err());
        assert_eq!(catalog.products().len(), 1);
    }
}
