//! Car listing domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carmart_core::{CarCondition, CarId, Price, UserId};

use super::user::UserSummary;

/// A stored listing photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarImage {
    /// Public URL the photo is served from.
    pub url: String,
    /// Key of the photo inside the image store.
    pub public_id: String,
}

/// A car listed for sale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    #[serde(rename = "_id")]
    pub id: CarId,
    /// The seller.
    #[serde(rename = "user")]
    pub owner: UserId,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: Price,
    pub mileage: i32,
    pub condition: CarCondition,
    /// Generated listing copy; absent when generation was unavailable.
    pub description: Option<String>,
    pub images: Vec<CarImage>,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Car {
    /// Short projection embedded in booking listings.
    #[must_use]
    pub fn summary(&self) -> CarSummary {
        CarSummary {
            id: self.id,
            make: self.make.clone(),
            model: self.model.clone(),
            year: self.year,
        }
    }
}

/// Fields for inserting a listing.
#[derive(Debug, Clone)]
pub struct NewCar {
    pub owner: UserId,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: Price,
    pub mileage: i32,
    pub condition: CarCondition,
    pub description: Option<String>,
    pub images: Vec<CarImage>,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
}

/// Make, model and year of a car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarSummary {
    #[serde(rename = "_id")]
    pub id: CarId,
    pub make: String,
    pub model: String,
    pub year: i32,
}

/// A listing together with its seller.
#[derive(Debug, Clone)]
pub struct CarWithOwner {
    pub car: Car,
    pub owner: UserSummary,
}

/// Seller name embedded in the public listing index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerName {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
}

/// A listing with its seller embedded in place of the bare `user` id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarView<U> {
    #[serde(rename = "_id")]
    pub id: CarId,
    pub user: U,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: Price,
    pub mileage: i32,
    pub condition: CarCondition,
    pub description: Option<String>,
    pub images: Vec<CarImage>,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CarWithOwner {
    fn view<U>(self, user: U) -> CarView<U> {
        let car = self.car;
        CarView {
            id: car.id,
            user,
            make: car.make,
            model: car.model,
            year: car.year,
            price: car.price,
            mileage: car.mileage,
            condition: car.condition,
            description: car.description,
            images: car.images,
            engine: car.engine,
            transmission: car.transmission,
            color: car.color,
            created_at: car.created_at,
            updated_at: car.updated_at,
        }
    }

    /// View for the public index: only the seller's name is shown.
    #[must_use]
    pub fn into_public_view(self) -> CarView<SellerName> {
        let seller = SellerName {
            id: self.owner.id,
            name: self.owner.name.clone(),
        };
        self.view(seller)
    }

    /// View for admins: the seller's name and email are embedded.
    #[must_use]
    pub fn into_admin_view(self) -> CarView<UserSummary> {
        let owner = self.owner.clone();
        self.view(owner)
    }
}

/// Criteria for finding listings that resemble an analyzed photo.
///
/// Each `None` criterion matches everything. Make and model match as
/// case-insensitive substrings; the year matches an inclusive range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimilarCarQuery {
    pub make: Option<String>,
    pub model: Option<String>,
    pub years: Option<(i32, i32)>,
}

impl SimilarCarQuery {
    /// Whether a listing satisfies every present criterion.
    ///
    /// Mirrors the Postgres `ILIKE` search for ASCII input. Case folding of
    /// other scripts follows Unicode here and the database locale there.
    #[must_use]
    pub fn matches(&self, car: &Car) -> bool {
        let contains = |haystack: &str, needle: &Option<String>| {
            needle
                .as_ref()
                .is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };
        contains(&car.make, &self.make)
            && contains(&car.model, &self.model)
            && self
                .years
                .is_none_or(|(low, high)| (low..=high).contains(&car.year))
    }
}
