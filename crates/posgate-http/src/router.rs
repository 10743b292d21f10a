//! Resource routing: maps admitted requests onto upstream POS API resources.
//!
//! The gateway exposes a small fixed surface. Each inbound method + path
//! resolves to one [`ResourceRoute`], which knows the upstream path and query
//! it forwards to:
//!
//! | Inbound | Upstream |
//! |---------|----------|
//! | `GET /customers/{phone}` | `GET v1/customers?q_q={phone}` |
//! | `POST /customers` | `POST v1/customers` |
//! | `GET /products/categories` | `GET v1/products/categories?page={page}` |
//! | `GET /products/locations/{id}` | `GET v1/products/locations/{id}?...&page={page}` |
//! | `GET /products/{itemId}` | `GET v1/products/{itemId}` |
//! | `GET /sales/bills/customer/{id}` | `GET v1/sales/bills/customer/{id}` |
//! | `GET /sales/bills/{billNumber}` | `GET v1/sales/bills/{billNumber}` |
//! | `POST /quotations` | `POST v1/quotations`, then `POST v1/quotations/{id}/lines` |

use std::fmt;

use http::Method;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters escaped when a value is placed into an upstream path segment or
/// query value. Matches `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Page requested when the caller does not ask for one.
const DEFAULT_PAGE: &str = "1";

/// An upstream POS resource an admitted request maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRoute {
    /// Look up customers by phone number.
    CustomerByPhone {
        /// Phone number used as the search term.
        phone: String,
    },
    /// Create a customer from the forwarded JSON body.
    CreateCustomer,
    /// List product categories.
    ProductCategories {
        /// Page number.
        page: String,
    },
    /// List products stocked at a location, filtered by category or name.
    LocationProducts {
        /// Location identifier.
        location_id: String,
        /// Page number.
        page: String,
        /// Category filter; takes precedence over `name`.
        category: Option<String>,
        /// Product name filter.
        name: Option<String>,
    },
    /// Fetch a single product.
    Product {
        /// Product identifier.
        item_id: String,
    },
    /// List bills issued to a customer.
    CustomerBills {
        /// Customer identifier.
        customer_id: String,
    },
    /// Fetch a single bill.
    Bill {
        /// Bill number.
        bill_number: String,
    },
    /// Create a quotation and attach its lines.
    CreateQuotation,
}

/// Why a request did not match any resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No resource lives at this path.
    #[error("Not found")]
    NotFound,
    /// The path exists but not for this method.
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ResourceRoute {
    /// Resolve a request method, path, and raw query string to a route.
    ///
    /// # Examples
    ///
    /// ```
    /// use http::Method;
    /// use posgate_http::router::ResourceRoute;
    ///
    /// let route = ResourceRoute::resolve(&Method::GET, "/products/categories", None).unwrap();
    /// assert_eq!(route.upstream_path(), "v1/products/categories?page=1");
    /// ```
    pub fn resolve(method: &Method, path: &str, query: Option<&str>) -> Result<Self, RouteError> {
        let segments: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(decode_path_segment)
            .collect();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let params = parse_query(query.unwrap_or(""));

        let get = |route: Self| {
            if *method == Method::GET {
                Ok(route)
            } else {
                Err(RouteError::MethodNotAllowed)
            }
        };
        let post = |route: Self| {
            if *method == Method::POST {
                Ok(route)
            } else {
                Err(RouteError::MethodNotAllowed)
            }
        };

        match segments.as_slice() {
            ["customers"] => post(Self::CreateCustomer),
            ["customers", phone] if !phone.is_empty() => get(Self::CustomerByPhone {
                phone: (*phone).to_owned(),
            }),
            ["products", "categories"] => get(Self::ProductCategories {
                page: page_param(&params),
            }),
            ["products", "locations", location_id] if !location_id.is_empty() => {
                get(Self::LocationProducts {
                    location_id: (*location_id).to_owned(),
                    page: page_param(&params),
                    category: non_empty_param(&params, "q_Category"),
                    name: non_empty_param(&params, "q_name"),
                })
            }
            ["products", item_id] if !item_id.is_empty() => get(Self::Product {
                item_id: (*item_id).to_owned(),
            }),
            ["sales", "bills", "customer", customer_id] if !customer_id.is_empty() => {
                get(Self::CustomerBills {
                    customer_id: (*customer_id).to_owned(),
                })
            }
            ["sales", "bills", bill_number] if !bill_number.is_empty() => get(Self::Bill {
                bill_number: (*bill_number).to_owned(),
            }),
            ["quotations"] => post(Self::CreateQuotation),
            _ => Err(RouteError::NotFound),
        }
    }

    /// HTTP method used for the (first) upstream call.
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::CreateCustomer | Self::CreateQuotation => Method::POST,
            _ => Method::GET,
        }
    }

    /// Whether the inbound body is needed to build the upstream call.
    #[must_use]
    pub fn forwards_body(&self) -> bool {
        matches!(self, Self::CreateCustomer | Self::CreateQuotation)
    }

    /// Upstream path and query relative to the API base URL.
    ///
    /// For [`ResourceRoute::CreateQuotation`] this is the first of its two calls.
    #[must_use]
    pub fn upstream_path(&self) -> String {
        match self {
            Self::CustomerByPhone { phone } => format!("v1/customers?q_q={}", encode(phone)),
            Self::CreateCustomer => "v1/customers".to_owned(),
            Self::ProductCategories { page } => {
                format!("v1/products/categories?page={}", encode(page))
            }
            Self::LocationProducts {
                location_id,
                page,
                category,
                name,
            } => {
                let location_id = encode(location_id);
                let page = encode(page);
                match (category, name) {
                    (Some(category), _) => format!(
                        "v1/products/locations/{location_id}?q_Category={}&page={page}",
                        encode(category)
                    ),
                    (None, Some(name)) => format!(
                        "v1/products/locations/{location_id}?q_name={}&page={page}",
                        encode(name)
                    ),
                    (None, None) => format!("v1/products/locations/{location_id}?page={page}"),
                }
            }
            Self::Product { item_id } => format!("v1/products/{}", encode(item_id)),
            Self::CustomerBills { customer_id } => {
                format!("v1/sales/bills/customer/{}", encode(customer_id))
            }
            Self::Bill { bill_number } => format!("v1/sales/bills/{}", encode(bill_number)),
            Self::CreateQuotation => "v1/quotations".to_owned(),
        }
    }
}

impl fmt::Display for ResourceRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CustomerByPhone { .. } => "CustomerByPhone",
            Self::CreateCustomer => "CreateCustomer",
            Self::ProductCategories { .. } => "ProductCategories",
            Self::LocationProducts { .. } => "LocationProducts",
            Self::Product { .. } => "Product",
            Self::CustomerBills { .. } => "CustomerBills",
            Self::Bill { .. } => "Bill",
            Self::CreateQuotation => "CreateQuotation",
        };
        f.write_str(name)
    }
}

/// Upstream path that receives the lines of a freshly created quotation.
#[must_use]
pub fn quotation_lines_path(quotation_id: &str) -> String {
    format!("v1/quotations/{}/lines", encode(quotation_id))
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

fn decode_path_segment(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Parse a raw query string. `+` decodes to a space, as browsers send it.
fn parse_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// First non-empty value for `key`.
fn non_empty_param(params: &[(String, String)], key: &str) -> Option<String> {
    params
        .iter()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.clone())
}

fn page_param(params: &[(String, String)]) -> String {
    non_empty_param(params, "page").unwrap_or_else(|| DEFAULT_PAGE.to_owned())
}
