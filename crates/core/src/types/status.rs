//! Status and classification enums for catalog, orders and accounts.
//!
//! Every enum here maps to a Postgres enum type in the `bika` schema and
//! serializes in `snake_case`, matching the wire values mobile clients send.

use serde::{Deserialize, Serialize};

/// Implements `as_str`, `Display` and `FromStr` from a single value table.
macro_rules! wire_names {
    ($ty:ident, $label:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire and database representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl ::core::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($name => Ok(Self::$variant),)+
                    other => Err(format!(concat!("invalid ", $label, ": {}"), other)),
                }
            }
        }
    };
}

/// Product lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bika.product_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    OutOfStock,
    Discontinued,
}

wire_names!(ProductStatus, "product status", {
    Draft => "draft",
    Active => "active",
    OutOfStock => "out_of_stock",
    Discontinued => "discontinued",
});

impl ProductStatus {
    /// Whether a product in this status can still be ordered.
    ///
    /// `OutOfStock` stays orderable so the stock check can report how many
    /// units are left instead of a generic unavailability.
    #[must_use]
    pub const fn is_orderable(self) -> bool {
        matches!(self, Self::Active | Self::OutOfStock)
    }
}

/// Who may see a product besides its creator and global admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bika.visibility", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Members of the creator's or the vendor's unit.
    #[default]
    Unit,
    /// The vendor account that owns the product.
    Vendor,
    /// Only the creator.
    Private,
}

wire_names!(Visibility, "visibility", {
    Unit => "unit",
    Vendor => "vendor",
    Private => "private",
});

/// Order fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bika.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

wire_names!(OrderStatus, "order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

/// Payment settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bika.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

wire_names!(PaymentStatus, "payment status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
    Refunded => "refunded",
});

/// Supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bika.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    // Mobile money, Tanzania
    Mpesa,
    TigoTz,
    AirtelTz,
    HalotelTz,
    // Mobile money, Rwanda
    MtnRw,
    AirtelRw,
    // Mobile money, Uganda
    MtnUg,
    AirtelUg,
    // Mobile money, Kenya
    MpesaKe,
    // Cards and international
    Visa,
    Mastercard,
    Amex,
    Paypal,
    BankTransfer,
}

wire_names!(PaymentMethod, "payment method", {
    Mpesa => "mpesa",
    TigoTz => "tigo_tz",
    AirtelTz => "airtel_tz",
    HalotelTz => "halotel_tz",
    MtnRw => "mtn_rw",
    AirtelRw => "airtel_rw",
    MtnUg => "mtn_ug",
    AirtelUg => "airtel_ug",
    MpesaKe => "mpesa_ke",
    Visa => "visa",
    Mastercard => "mastercard",
    Amex => "amex",
    Paypal => "paypal",
    BankTransfer => "bank_transfer",
});

impl PaymentMethod {
    /// Methods that settle at the moment the order is recorded.
    #[must_use]
    pub const fn settles_immediately(self) -> bool {
        matches!(self, Self::BankTransfer)
    }

    /// Whether the method is a mobile money wallet.
    #[must_use]
    pub const fn is_mobile_money(self) -> bool {
        !matches!(
            self,
            Self::Visa | Self::Mastercard | Self::Amex | Self::Paypal | Self::BankTransfer
        )
    }
}

/// Collaboration role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bika.role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Staff,
    Commander,
    Admin,
}

wire_names!(Role, "role", {
    Staff => "staff",
    Commander => "commander",
    Admin => "admin",
});

/// Kind of account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "bika.user_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    Customer,
    Vendor,
    Admin,
}

wire_names!(UserType, "user type", {
    Customer => "customer",
    Vendor => "vendor",
    Admin => "admin",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_wire_names_match_serde() {
        for method in PaymentMethod::ALL {
            let json = serde_json::to_string(method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), *method);
        }
    }

    #[test]
    fn test_unknown_payment_method() {
        let err = "bitcoin".parse::<PaymentMethod>().unwrap_err();
        assert_eq!(err, "invalid payment method: bitcoin");
    }

    #[test]
    fn test_only_bank_transfer_settles_immediately() {
        let immediate: Vec<_> = PaymentMethod::ALL
            .iter()
            .filter(|m| m.settles_immediately())
            .collect();
        assert_eq!(immediate, vec![&PaymentMethod::BankTransfer]);
        assert!(PaymentMethod::MtnRw.is_mobile_money());
        assert!(!PaymentMethod::Visa.is_mobile_money());
    }

    #[test]
    fn test_orderable_statuses() {
        assert!(ProductStatus::Active.is_orderable());
        assert!(ProductStatus::OutOfStock.is_orderable());
        assert!(!ProductStatus::Draft.is_orderable());
        assert!(!ProductStatus::Discontinued.is_orderable());
    }

    #[test]
    fn test_product_status_round_trip_names() {
        assert_eq!(ProductStatus::OutOfStock.to_string(), "out_of_stock");
        assert_eq!(
            "out_of_stock".parse::<ProductStatus>().unwrap(),
            ProductStatus::OutOfStock
        );
    }
}
