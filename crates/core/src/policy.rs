//! Catalog visibility rules.
//!
//! One rule set answers every access question: list scoping, detail reads,
//! cart adds, checkout revalidation and mutation. [`can_view`] is the single
//! source of truth; [`VisibilityScope`] is the same rule expressed as data so a
//! store can turn it into a query predicate.

use serde::{Deserialize, Serialize};

use crate::types::{Identity, ProductStatus, UnitId, UserId, Visibility};

/// The ownership facts of a product needed to decide access.
///
/// Stores build this with an eager join on the creator and vendor accounts so
/// their units are plain values, not lazy lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAccess {
    pub created_by: Option<UserId>,
    pub vendor_id: Option<UserId>,
    pub creator_unit_id: Option<UnitId>,
    pub vendor_unit_id: Option<UnitId>,
    pub visibility: Visibility,
    pub status: ProductStatus,
}

impl ProductAccess {
    fn is_created_by(&self, user_id: UserId) -> bool {
        self.created_by == Some(user_id)
    }

    fn shares_unit(&self, unit_id: UnitId) -> bool {
        self.creator_unit_id == Some(unit_id) || self.vendor_unit_id == Some(unit_id)
    }
}

/// Whether `identity` may see `product`. First matching rule wins.
#[must_use]
pub fn can_view(identity: Option<&Identity>, product: &ProductAccess) -> bool {
    let Some(identity) = identity else {
        return false;
    };

    if identity.is_global_admin() || product.is_created_by(identity.id) {
        return true;
    }

    match product.visibility {
        Visibility::Private => false,
        // Exact vendor account, not the vendor's unit.
        Visibility::Vendor => product.vendor_id == Some(identity.id),
        Visibility::Unit => identity
            .unit_id
            .is_some_and(|unit_id| product.shares_unit(unit_id)),
    }
}

/// Whether `identity` may edit or delete `product`. Only creators and global admins can.
#[must_use]
pub fn can_mutate(identity: &Identity, product: &ProductAccess) -> bool {
    identity.is_global_admin() || product.is_created_by(identity.id)
}

/// Stock may also be adjusted by the vendor account that owns the product.
#[must_use]
pub fn can_adjust_stock(identity: &Identity, product: &ProductAccess) -> bool {
    can_mutate(identity, product) || product.vendor_id == Some(identity.id)
}

/// Visible, and either live or owned by the caller.
///
/// Used for product detail and add-to-cart, where drafts and discontinued
/// products of other users must look absent.
#[must_use]
pub fn can_browse(identity: &Identity, product: &ProductAccess) -> bool {
    can_view(Some(identity), product)
        && (product.status == ProductStatus::Active
            || identity.is_global_admin()
            || product.is_created_by(identity.id))
}

/// Visible and in an orderable status. Checkout refuses anything else.
#[must_use]
pub fn is_purchasable(identity: &Identity, product: &ProductAccess) -> bool {
    can_view(Some(identity), product) && product.status.is_orderable()
}

/// [`can_view`] for a fixed identity, expressed as a predicate over products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityScope {
    /// Anonymous callers.
    Nothing,
    /// Global admins.
    Everything,
    /// Everyone else: own products, vendor-owned products, and unit-shared products.
    Scoped {
        user_id: UserId,
        unit_id: Option<UnitId>,
    },
}

impl VisibilityScope {
    #[must_use]
    pub fn for_identity(identity: Option<&Identity>) -> Self {
        match identity {
            None => Self::Nothing,
            Some(identity) if identity.is_global_admin() => Self::Everything,
            Some(identity) => Self::Scoped {
                user_id: identity.id,
                unit_id: identity.unit_id,
            },
        }
    }

    /// Evaluate the predicate in memory.
    #[must_use]
    pub fn matches(&self, product: &ProductAccess) -> bool {
        match *self {
            Self::Nothing => false,
            Self::Everything => true,
            Self::Scoped { user_id, unit_id } => {
                product.is_created_by(user_id)
                    || (product.visibility == Visibility::Vendor
                        && product.vendor_id == Some(user_id))
                    || (product.visibility == Visibility::Unit
                        && unit_id.is_some_and(|unit_id| product.shares_unit(unit_id)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, UserType};
    use proptest::prelude::*;

    const U1: UserId = UserId::new(1);
    const U2: UserId = UserId::new(2);
    const VENDOR: UserId = UserId::new(3);
    const UNIT_A: UnitId = UnitId::new(10);
    const UNIT_B: UnitId = UnitId::new(20);

    fn product(visibility: Visibility) -> ProductAccess {
        ProductAccess {
            created_by: Some(U1),
            vendor_id: Some(VENDOR),
            creator_unit_id: Some(UNIT_A),
            vendor_unit_id: Some(UNIT_B),
            visibility,
            status: ProductStatus::Active,
        }
    }

    fn user(id: UserId, unit: Option<UnitId>) -> Identity {
        Identity {
            unit_id: unit,
            ..Identity::customer(id)
        }
    }

    #[test]
    fn test_anonymous_sees_nothing() {
        assert!(!can_view(None, &product(Visibility::Unit)));
        assert!(!VisibilityScope::Nothing.matches(&product(Visibility::Unit)));
    }

    #[test]
    fn test_private_is_creator_and_admin_only() {
        let p = product(Visibility::Private);
        assert!(can_view(Some(&user(U1, None)), &p));
        assert!(!can_view(Some(&user(U2, Some(UNIT_A))), &p));
        assert!(!can_view(Some(&user(VENDOR, Some(UNIT_B))), &p));

        let mut admin = user(U2, None);
        admin.is_superuser = true;
        assert!(can_view(Some(&admin), &p));
    }

    #[test]
    fn test_vendor_visibility_is_exact_owner_match() {
        let p = product(Visibility::Vendor);
        assert!(can_view(Some(&user(VENDOR, None)), &p));
        // Unit-mate of the vendor is not the vendor.
        assert!(!can_view(Some(&user(U2, Some(UNIT_B))), &p));
    }

    #[test]
    fn test_unit_visibility_matches_creator_or_vendor_unit() {
        let p = product(Visibility::Unit);
        assert!(can_view(Some(&user(U2, Some(UNIT_A))), &p));
        assert!(can_view(Some(&user(U2, Some(UNIT_B))), &p));
        assert!(!can_view(Some(&user(U2, Some(UnitId::new(99)))), &p));
        assert!(!can_view(Some(&user(U2, None)), &p));
    }

    #[test]
    fn test_unit_visibility_ignores_missing_units() {
        let p = ProductAccess {
            creator_unit_id: None,
            vendor_unit_id: None,
            ..product(Visibility::Unit)
        };
        assert!(!can_view(Some(&user(U2, None)), &p));
        assert!(!can_view(Some(&user(U2, Some(UNIT_A))), &p));
    }

    #[test]
    fn test_viewers_cannot_mutate() {
        let p = product(Visibility::Unit);
        let mate = user(U2, Some(UNIT_A));
        assert!(can_view(Some(&mate), &p));
        assert!(!can_mutate(&mate, &p));
        assert!(can_mutate(&user(U1, None), &p));

        let mut commander = mate;
        commander.role = Role::Admin;
        assert!(can_mutate(&commander, &p));
    }

    #[test]
    fn test_vendor_can_adjust_stock_but_not_mutate() {
        let p = product(Visibility::Vendor);
        let vendor = Identity {
            user_type: UserType::Vendor,
            ..user(VENDOR, None)
        };
        assert!(!can_mutate(&vendor, &p));
        assert!(can_adjust_stock(&vendor, &p));
        assert!(!can_adjust_stock(&user(U2, Some(UNIT_A)), &p));
    }

    #[test]
    fn test_drafts_are_browsable_by_owner_only() {
        let p = ProductAccess {
            status: ProductStatus::Draft,
            ..product(Visibility::Unit)
        };
        assert!(can_browse(&user(U1, None), &p));
        assert!(!can_browse(&user(U2, Some(UNIT_A)), &p));
    }

    #[test]
    fn test_purchasable_requires_orderable_status() {
        let mate = user(U2, Some(UNIT_A));
        let mut p = product(Visibility::Unit);
        assert!(is_purchasable(&mate, &p));
        p.status = ProductStatus::OutOfStock;
        assert!(is_purchasable(&mate, &p));
        p.status = ProductStatus::Discontinued;
        assert!(!is_purchasable(&mate, &p));
        // Ownership does not make a draft orderable.
        p.status = ProductStatus::Draft;
        assert!(!is_purchasable(&user(U1, None), &p));
    }

    fn arb_user() -> impl Strategy<Value = UserId> {
        (1_i64..=4).prop_map(UserId::new)
    }

    fn arb_unit() -> impl Strategy<Value = Option<UnitId>> {
        proptest::option::of((1_i64..=3).prop_map(UnitId::new))
    }

    fn arb_identity() -> impl Strategy<Value = Identity> {
        (
            arb_user(),
            any::<bool>(),
            prop_oneof![Just(Role::Staff), Just(Role::Commander), Just(Role::Admin)],
            prop_oneof![
                Just(UserType::Customer),
                Just(UserType::Vendor),
                Just(UserType::Admin)
            ],
            arb_unit(),
        )
            .prop_map(|(id, is_superuser, role, user_type, unit_id)| Identity {
                id,
                is_superuser,
                role,
                user_type,
                unit_id,
            })
    }

    fn arb_product() -> impl Strategy<Value = ProductAccess> {
        (
            proptest::option::of(arb_user()),
            proptest::option::of(arb_user()),
            arb_unit(),
            arb_unit(),
            prop_oneof![
                Just(Visibility::Unit),
                Just(Visibility::Vendor),
                Just(Visibility::Private)
            ],
            prop_oneof![
                Just(ProductStatus::Draft),
                Just(ProductStatus::Active),
                Just(ProductStatus::OutOfStock),
                Just(ProductStatus::Discontinued)
            ],
        )
            .prop_map(
                |(created_by, vendor_id, creator_unit_id, vendor_unit_id, visibility, status)| {
                    ProductAccess {
                        created_by,
                        vendor_id,
                        creator_unit_id,
                        vendor_unit_id,
                        visibility,
                        status,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn prop_scope_agrees_with_can_view(
            identity in proptest::option::of(arb_identity()),
            product in arb_product(),
        ) {
            let scope = VisibilityScope::for_identity(identity.as_ref());
            prop_assert_eq!(scope.matches(&product), can_view(identity.as_ref(), &product));
        }

        #[test]
        fn prop_private_never_leaks(identity in arb_identity(), product in arb_product()) {
            let product = ProductAccess { visibility: Visibility::Private, ..product };
            let allowed = identity.is_global_admin() || product.created_by == Some(identity.id);
            prop_assert_eq!(can_view(Some(&identity), &product), allowed);
        }

        #[test]
        fn prop_mutation_implies_visibility(identity in arb_identity(), product in arb_product()) {
            if can_mutate(&identity, &product) {
                prop_assert!(can_view(Some(&identity), &product));
            }
            if can_browse(&identity, &product) || is_purchasable(&identity, &product) {
                prop_assert!(can_view(Some(&identity), &product));
            }
        }
    }
}
