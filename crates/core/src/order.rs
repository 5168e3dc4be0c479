//! Orders and the pending → finalized transition.
//!
//! An order is created at checkout-start with its products and total only.
//! It stays pending until [`finalize`] attaches delivery details, after which
//! it never changes again. A user holds at most one pending order at a time:
//! [`ensure_no_pending`] guards creation and [`finalize`] refuses to guess when
//! the invariant has been broken.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::CoreError;
use crate::types::{Email, OrderId, OrderState, Price, ProductId};

/// Delivery and payment fields of an order. All unset while pending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub place: Option<String>,
    pub day: Option<String>,
    pub month: Option<String>,
    pub year: Option<String>,
    /// Delivery time window, e.g. "08:00-09:00".
    pub time: Option<String>,
    pub comments: Option<String>,
    #[serde(default)]
    pub paid: bool,
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub products: Vec<ProductId>,
    pub total: Price,
    #[serde(flatten)]
    pub delivery: Delivery,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order.
    #[must_use]
    pub fn new(id: OrderId, products: Vec<ProductId>, total: Price, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            products,
            total,
            delivery: Delivery::default(),
            created_at,
        }
    }

    /// Pending while place, time window or payment is missing.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.delivery.place.is_none() || self.delivery.time.is_none() || !self.delivery.paid
    }

    #[must_use]
    pub const fn state(&self) -> OrderState {
        if self.is_pending() {
            OrderState::Pending
        } else {
            OrderState::Finalized
        }
    }

    fn apply(&mut self, details: DeliveryDetails) {
        self.delivery = Delivery {
            place: Some(details.place),
            day: Some(details.day),
            month: Some(details.month),
            year: Some(details.year),
            time: Some(details.time),
            comments: details.comments,
            paid: details.paid,
        };
    }
}

/// Input for creating an order at checkout-start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub products: Vec<ProductId>,
    pub total: Price,
}

impl NewOrder {
    /// Check the order against the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Invalid`] for an empty product list or a negative
    /// total, and [`CoreError::NotFound`] for a product the catalog lacks.
    pub fn validate<C: Catalog + ?Sized>(&self, catalog: &C) -> Result<(), CoreError> {
        if self.products.is_empty() {
            return Err(CoreError::invalid("products", "an order needs at least one product"));
        }
        if self.total.is_negative() {
            return Err(CoreError::invalid("total", "must not be negative"));
        }
        if let Some(missing) = self.products.iter().find(|id| catalog.find(id).is_none()) {
            return Err(CoreError::NotFound(format!("product {missing}")));
        }
        Ok(())
    }
}

/// Delivery details supplied by the finalize step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub place: String,
    pub day: String,
    pub month: String,
    pub year: String,
    pub time: String,
    #[serde(default)]
    pub comments: Option<String>,
    pub paid: bool,
}

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

impl DeliveryDetails {
    /// Trim every field and reject anything that cannot finalize an order.
    ///
    /// Months are accepted as `1`-`12` or as English month names. Blank
    /// comments become `None`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Invalid`] naming the first offending field.
    pub fn normalized(self) -> Result<Self, CoreError> {
        let place = required("place", &self.place)?;
        let time = required("time", &self.time)?;
        let day = required("day", &self.day)?;
        let month = required("month", &self.month)?;
        let year = required("year", &self.year)?;

        in_range("day", &day, 1..=31)?;
        if !MONTH_NAMES.contains(&month.to_lowercase().as_str()) {
            in_range("month", &month, 1..=12)?;
        }
        if year.len() != 4 {
            return Err(CoreError::invalid("year", "must have four digits"));
        }
        in_range("year", &year, 2000..=9999)?;

        if !self.paid {
            return Err(CoreError::invalid("paid", "order must be paid to be finalized"));
        }

        let comments = self
            .comments
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        Ok(Self {
            place,
            day,
            month,
            year,
            time,
            comments,
            paid: true,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::invalid(field, "must not be blank"));
    }
    Ok(value.to_owned())
}

fn in_range(
    field: &'static str,
    value: &str,
    range: std::ops::RangeInclusive<u32>,
) -> Result<(), CoreError> {
    match value.parse::<u32>() {
        Ok(n) if range.contains(&n) => Ok(()),
        _ => Err(CoreError::invalid(
            field,
            format!("must be a number between {} and {}", range.start(), range.end()),
        )),
    }
}

/// Result of a successful [`finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    /// The order as it must now be persisted.
    pub order: Order,
    /// The caller must empty the user's basket in the same write.
    pub clear_basket: bool,
}

/// Who receives the order confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub email: Email,
}

/// Everything the order-confirmation notification carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    pub name: String,
    pub email: Email,
    pub order_id: OrderId,
    pub place: String,
    pub day: String,
    pub month: String,
    pub year: String,
    pub time: String,
    pub comments: Option<String>,
    pub products: Vec<String>,
    pub total: Price,
}

impl Finalized {
    /// Build the confirmation for `recipient`, resolving product names.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if an ordered product left the catalog.
    pub fn confirmation<C: Catalog + ?Sized>(
        &self,
        recipient: Recipient,
        catalog: &C,
    ) -> Result<OrderConfirmation, CoreError> {
        let products = self
            .order
            .products
            .iter()
            .map(|id| {
                catalog
                    .find(id)
                    .map(|p| p.name.clone())
                    .ok_or_else(|| CoreError::NotFound(format!("product {id}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let delivery = &self.order.delivery;
        Ok(OrderConfirmation {
            name: recipient.name,
            email: recipient.email,
            order_id: self.order.id.clone(),
            place: delivery.place.clone().unwrap_or_default(),
            day: delivery.day.clone().unwrap_or_default(),
            month: delivery.month.clone().unwrap_or_default(),
            year: delivery.year.clone().unwrap_or_default(),
            time: delivery.time.clone().unwrap_or_default(),
            comments: delivery.comments.clone(),
            products,
            total: self.order.total,
        })
    }
}

/// Attach delivery details to the single pending order.
///
/// Nothing is mutated unless every check passes. `details.paid` must be
/// `true`: an unpaid order would still be pending afterwards, so it is
/// rejected instead of being recorded.
///
/// # Errors
///
/// - [`CoreError::NotFound`] when no order is pending (including a repeated
///   finalize on an already-finalized collection).
/// - [`CoreError::Conflict`] when more than one order is pending.
/// - [`CoreError::Invalid`] when the details are incomplete or malformed, or
///   `paid` is `false`.
pub fn finalize(orders: &mut [Order], details: DeliveryDetails) -> Result<Finalized, CoreError> {
    let pending: Vec<usize> = orders
        .iter()
        .enumerate()
        .filter(|(_, order)| order.is_pending())
        .map(|(index, _)| index)
        .collect();

    let index = match pending.as_slice() {
        [] => return Err(CoreError::NotFound("no pending order to finalize".to_owned())),
        [index] => *index,
        many => {
            return Err(CoreError::Conflict(format!(
                "{} pending orders found, expected exactly one",
                many.len()
            )));
        }
    };

    let details = details.normalized()?;
    let order = orders
        .get_mut(index)
        .ok_or_else(|| CoreError::NotFound("no pending order to finalize".to_owned()))?;
    order.apply(details);

    Ok(Finalized {
        order: order.clone(),
        clear_basket: true,
    })
}

/// Refuse to open a second pending order.
///
/// # Errors
///
/// Returns [`CoreError::Conflict`] if any order is still pending.
pub fn ensure_no_pending(orders: &[Order]) -> Result<(), CoreError> {
    match orders.iter().find(|o| o.is_pending()) {
        Some(order) => Err(CoreError::Conflict(format!(
            "order {} is still awaiting delivery details",
            order.id
        ))),
        None => Ok(()),
    }
}

/// Remove every pending order, returning the ids that were dropped.
pub fn discard_pending(orders: &mut Vec<Order>) -> Vec<OrderId> {
    let mut removed = Vec::new();
    orders.retain(|order| {
        if order.is_pending() {
            removed.push(order.id.clone());
            false
        } else {
            true
        }
    });
    removed
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::catalog::fixtures::product;
    use crate::catalog::index;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn pending(id: &str) -> Order {
        Order::new(
            OrderId::new(id),
            vec![ProductId::new("p1"), ProductId::new("p2")],
            Price::from_cents(450),
            at(8),
        )
    }

    fn finalized(id: &str) -> Order {
        let mut order = pending(id);
        order.apply(details());
        order
    }

    fn details() -> DeliveryDetails {
        DeliveryDetails {
            place: "Carrer de Balmes 12".to_owned(),
            day: "14".to_owned(),
            month: "March".to_owned(),
            year: "2024".to_owned(),
            time: "08:00-09:00".to_owned(),
            comments: Some("  ring twice ".to_owned()),
            paid: true,
        }
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = pending("o1");
        assert!(order.is_pending());
        assert_eq!(order.state(), OrderState::Pending);
    }

    #[test]
    fn test_partially_filled_order_is_pending() {
        let mut order = pending("o1");
        order.delivery.place = Some("Office".to_owned());
        order.delivery.time = Some("09:00".to_owned());
        assert!(order.is_pending());

        order.delivery.paid = true;
        assert_eq!(order.state(), OrderState::Finalized);
    }

    #[test]
    fn test_finalize_single_pending() {
        let mut orders = vec![finalized("o1"), pending("o2")];
        let result = finalize(&mut orders, details()).unwrap();

        assert!(result.clear_basket);
        assert_eq!(result.order.id.as_str(), "o2");
        assert_eq!(result.order.state(), OrderState::Finalized);
        assert_eq!(result.order.delivery.place.as_deref(), Some("Carrer de Balmes 12"));
        assert_eq!(result.order.delivery.day.as_deref(), Some("14"));
        assert_eq!(result.order.delivery.month.as_deref(), Some("March"));
        assert_eq!(result.order.delivery.year.as_deref(), Some("2024"));
        assert_eq!(result.order.delivery.time.as_deref(), Some("08:00-09:00"));
        assert_eq!(result.order.delivery.comments.as_deref(), Some("ring twice"));
        assert!(result.order.delivery.paid);
        assert_eq!(orders[1], result.order);
    }

    #[test]
    fn test_finalize_without_pending_is_not_found() {
        let mut orders = vec![finalized("o1")];
        let err = finalize(&mut orders, details()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));

        let err = finalize(&mut [], details()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_finalize_two_pending_is_conflict_and_mutates_nothing() {
        let mut orders = vec![pending("o1"), pending("o2")];
        let before = orders.clone();

        let err = finalize(&mut orders, details()).unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(orders, before);
    }

    #[test]
    fn test_finalize_twice_fails_second_time() {
        let mut orders = vec![pending("o1")];
        finalize(&mut orders, details()).unwrap();
        let snapshot = orders.clone();

        let err = finalize(&mut orders, details()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert_eq!(orders, snapshot);
    }

    #[test]
    fn test_finalize_invalid_details_mutates_nothing() {
        let mut orders = vec![pending("o1")];
        let mut bad = details();
        bad.place = "   ".to_owned();

        let err = finalize(&mut orders, bad).unwrap_err();
        assert_eq!(err, CoreError::invalid("place", "must not be blank"));
        assert!(orders[0].is_pending());
    }

    #[test]
    fn test_finalize_rejects_unpaid_order() {
        let mut orders = vec![pending("o1")];
        let unpaid = DeliveryDetails {
            paid: false,
            ..details()
        };

        let err = finalize(&mut orders, unpaid).unwrap_err();
        assert!(matches!(err, CoreError::Invalid { field: "paid", .. }));
        assert!(orders[0].is_pending());
        assert!(orders[0].delivery.place.is_none());
    }

    #[test]
    fn test_details_validation() {
        let unpaid = DeliveryDetails {
            paid: false,
            ..details()
        };
        assert!(matches!(
            unpaid.normalized(),
            Err(CoreError::Invalid { field: "paid", .. })
        ));

        let bad_day = DeliveryDetails {
            day: "32".to_owned(),
            ..details()
        };
        assert!(matches!(
            bad_day.normalized(),
            Err(CoreError::Invalid { field: "day", .. })
        ));

        let numeric_month = DeliveryDetails {
            month: "3".to_owned(),
            ..details()
        };
        assert!(numeric_month.normalized().is_ok());

        let bad_month = DeliveryDetails {
            month: "Smarch".to_owned(),
            ..details()
        };
        assert!(matches!(
            bad_month.normalized(),
            Err(CoreError::Invalid { field: "month", .. })
        ));

        let bad_year = DeliveryDetails {
            year: "24".to_owned(),
            ..details()
        };
        assert!(matches!(
            bad_year.normalized(),
            Err(CoreError::Invalid { field: "year", .. })
        ));

        let blank_comments = DeliveryDetails {
            comments: Some("   ".to_owned()),
            ..details()
        };
        assert_eq!(blank_comments.normalized().unwrap().comments, None);
    }

    #[test]
    fn test_confirmation_resolves_product_names() {
        let mut orders = vec![pending("o1")];
        let result = finalize(&mut orders, details()).unwrap();
        let catalog = index([product("p1", "Croissant", 150), product("p2", "Juice", 300)]);
        let recipient = Recipient {
            name: "Pep".to_owned(),
            email: Email::parse("pep@example.com").unwrap(),
        };

        let confirmation = result.confirmation(recipient, &catalog).unwrap();
        assert_eq!(confirmation.products, ["Croissant", "Juice"]);
        assert_eq!(confirmation.total, Price::from_cents(450));
        assert_eq!(confirmation.place, "Carrer de Balmes 12");
        assert_eq!(confirmation.comments.as_deref(), Some("ring twice"));
    }

    #[test]
    fn test_confirmation_missing_product() {
        let mut orders = vec![pending("o1")];
        let result = finalize(&mut orders, details()).unwrap();
        let catalog = index([product("p1", "Croissant", 150)]);
        let recipient = Recipient {
            name: "Pep".to_owned(),
            email: Email::parse("pep@example.com").unwrap(),
        };

        assert!(matches!(
            result.confirmation(recipient, &catalog),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_ensure_no_pending() {
        assert!(ensure_no_pending(&[]).is_ok());
        assert!(ensure_no_pending(&[finalized("o1")]).is_ok());
        assert!(matches!(
            ensure_no_pending(&[finalized("o1"), pending("o2")]),
            Err(CoreError::Conflict(_))
        ));
    }

    #[test]
    fn test_discard_pending() {
        let mut orders = vec![pending("o1"), finalized("o2"), pending("o3")];
        let removed = discard_pending(&mut orders);

        assert_eq!(removed, [OrderId::new("o1"), OrderId::new("o3")]);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id.as_str(), "o2");
    }

    #[test]
    fn test_new_order_validation() {
        let catalog = index([product("p1", "Croissant", 150)]);

        let ok = NewOrder {
            products: vec![ProductId::new("p1")],
            total: Price::from_cents(150),
        };
        assert!(ok.validate(&catalog).is_ok());

        let empty = NewOrder {
            products: vec![],
            total: Price::ZERO,
        };
        assert!(matches!(
            empty.validate(&catalog),
            Err(CoreError::Invalid { field: "products", .. })
        ));

        let negative = NewOrder {
            products: vec![ProductId::new("p1")],
            total: Price::from_cents(-1),
        };
        assert!(matches!(
            negative.validate(&catalog),
            Err(CoreError::Invalid { field: "total", .. })
        ));

        let unknown = NewOrder {
            products: vec![ProductId::new("nope")],
            total: Price::ZERO,
        };
        assert!(matches!(unknown.validate(&catalog), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_order_json_shape() {
        let json = serde_json::to_value(finalized("o1")).unwrap();
        assert_eq!(json["total"], "4.50");
        assert_eq!(json["place"], "Carrer de Balmes 12");
        assert_eq!(json["paid"], true);
    }
}
