//! Static catalog of store resources.
//!
//! Every path segment the adapter accepts is listed here with the table it
//! maps to and the singular name used for response keys. Table names used in
//! queries only ever come from this catalog.

use std::fmt;

/// A catalog entry: URL segment, backing table, singular response key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableResource {
    pub path: &'static str,
    pub table: &'static str,
    pub singular: &'static str,
}

impl TableResource {
    /// Response key for list responses.
    #[must_use]
    pub fn plural(&self) -> String {
        pluralize(self.singular)
    }
}

/// Resource addressed by a store path.
///
/// Products, regions and carts have dedicated handlers with embedded
/// relations; everything else goes through generic table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Products,
    Regions,
    Carts,
    Table(&'static TableResource),
}

impl Resource {
    /// Look up a path segment in the catalog.
    #[must_use]
    pub fn from_path(segment: &str) -> Option<Self> {
        let entry = CATALOG.iter().find(|entry| entry.path == segment)?;
        Some(match entry.path {
            "products" => Self::Products,
            "regions" => Self::Regions,
            "carts" => Self::Carts,
            _ => Self::Table(entry),
        })
    }

    /// The path segment this resource is addressed by.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Products => PRODUCTS.path,
            Self::Regions => REGIONS.path,
            Self::Carts => CARTS.path,
            Self::Table(entry) => entry.path,
        }
    }

    /// The catalog entry behind this resource.
    #[must_use]
    pub const fn entry(&self) -> &'static TableResource {
        match self {
            Self::Products => &PRODUCTS,
            Self::Regions => &REGIONS,
            Self::Carts => &CARTS,
            Self::Table(entry) => *entry,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

const PRODUCTS: TableResource = TableResource {
    path: "products",
    table: "products",
    singular: "product",
};

const REGIONS: TableResource = TableResource {
    path: "regions",
    table: "regions",
    singular: "region",
};

const CARTS: TableResource = TableResource {
    path: "carts",
    table: "carts",
    singular: "cart",
};

/// Every resource reachable under `/store/`.
pub const CATALOG: &[TableResource] = &[
    PRODUCTS,
    TableResource {
        path: "product-categories",
        table: "product_categories",
        singular: "product_category",
    },
    TableResource {
        path: "collections",
        table: "collections",
        singular: "collection",
    },
    REGIONS,
    CARTS,
    TableResource {
        path: "customers",
        table: "customers",
        singular: "customer",
    },
    TableResource {
        path: "orders",
        table: "orders",
        singular: "order",
    },
    TableResource {
        path: "line-items",
        table: "line_items",
        singular: "line_item",
    },
    TableResource {
        path: "shipping-options",
        table: "shipping_options",
        singular: "shipping_option",
    },
    TableResource {
        path: "payment-sessions",
        table: "payment_sessions",
        singular: "payment_session",
    },
    TableResource {
        path: "addresses",
        table: "addresses",
        singular: "address",
    },
    TableResource {
        path: "price-lists",
        table: "price_lists",
        singular: "price_list",
    },
    TableResource {
        path: "discounts",
        table: "discounts",
        singular: "discount",
    },
    TableResource {
        path: "gift-cards",
        table: "gift_cards",
        singular: "gift_card",
    },
    TableResource {
        path: "return-reasons",
        table: "return_reasons",
        singular: "return_reason",
    },
    TableResource {
        path: "shipping-profiles",
        table: "shipping_profiles",
        singular: "shipping_profile",
    },
    TableResource {
        path: "tax-rates",
        table: "tax_rates",
        singular: "tax_rate",
    },
    TableResource {
        path: "currencies",
        table: "currencies",
        singular: "currency",
    },
    TableResource {
        path: "sales-channels",
        table: "sales_channels",
        singular: "sales_channel",
    },
];

/// Naive English plural used for list response keys.
///
/// `y` becomes `ies`, a trailing `s` gets `es`, anything else gets `s`.
/// Irregular plurals are not handled.
#[must_use]
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        format!("{stem}ies")
    } else if word.ends_with('s') {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("cart"), "carts");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("product_category"), "product_categories");
        assert_eq!(pluralize("currency"), "currencies");
        // Irregular plurals stay naive
        assert_eq!(pluralize("person"), "persons");
    }

    #[test]
    fn test_catalog_plural_matches_table() {
        for entry in CATALOG {
            assert_eq!(entry.plural(), entry.table, "{}", entry.path);
        }
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Resource::from_path("products"), Some(Resource::Products));
        assert_eq!(Resource::from_path("regions"), Some(Resource::Regions));
        assert_eq!(Resource::from_path("carts"), Some(Resource::Carts));

        let Some(Resource::Table(entry)) = Resource::from_path("product-categories") else {
            panic!("product-categories should be a table resource");
        };
        assert_eq!(entry.table, "product_categories");

        assert_eq!(Resource::from_path("product_categories"), None);
        assert_eq!(Resource::from_path("wishlists"), None);
        assert_eq!(CATALOG.len(), 19);
    }
}
