//! Car listings and search-by-image.

use thiserror::Error;
use tracing::instrument;

use carmart_core::{CarCondition, CarId, Price};

use crate::ai::{AiError, ImageAnalysis, ListingAssistant, ListingFacts};
use crate::db::{RepositoryError, Store};
use crate::models::{Car, CarImage, CarWithOwner, Identity, NewCar, SimilarCarQuery, User};
use crate::services::images::{ImageStore, ImageStoreError, extension_for};

/// Most photos a listing may carry.
pub const MAX_IMAGES: usize = 5;

/// Errors from listing operations.
#[derive(Debug, Error)]
pub enum ListingError {
    /// A required field was absent or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field could not be parsed.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Fewer than one or more than [`MAX_IMAGES`] photos were uploaded.
    #[error("please upload between 1 and {MAX_IMAGES} images")]
    ImageCount,

    /// A photo could not be stored.
    #[error(transparent)]
    Image(#[from] ImageStoreError),

    /// The listing does not exist.
    #[error("car not found")]
    NotFound,

    /// Image search matched nothing.
    #[error("no similar cars found")]
    NoSimilarCars,

    /// No assistant is configured.
    #[error("image search is not configured")]
    AssistantUnavailable,

    /// The assistant failed.
    #[error(transparent)]
    Ai(#[from] AiError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Raw listing fields as submitted in the multipart form.
#[derive(Debug, Default, Clone)]
pub struct ListingDraft {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub price: Option<String>,
    pub mileage: Option<String>,
    pub condition: Option<String>,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
}

/// An uploaded photo.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Contact details of a seller, shown to signed-in buyers.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerContact {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl From<User> for SellerContact {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email.into_inner(),
            phone_number: user.phone_number,
            address: user.address,
        }
    }
}

/// Listing service.
pub struct ListingService<'a> {
    store: &'a dyn Store,
    images: &'a ImageStore,
    assistant: Option<&'a dyn ListingAssistant>,
}

impl<'a> ListingService<'a> {
    /// Create a new listing service.
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        images: &'a ImageStore,
        assistant: Option<&'a dyn ListingAssistant>,
    ) -> Self {
        Self {
            store,
            images,
            assistant,
        }
    }

    /// Publish a listing for `owner`.
    ///
    /// Photos are written before the row is inserted and removed again if
    /// anything after the first write fails. A missing or failing assistant
    /// leaves the description empty.
    ///
    /// # Errors
    ///
    /// - `MissingField`/`InvalidField` for unusable form fields
    /// - `ImageCount` unless 1 to [`MAX_IMAGES`] photos were uploaded
    /// - `Image` if a photo is rejected or cannot be written
    #[instrument(skip_all, fields(user_id = %owner.id, images = uploads.len()))]
    pub async fn create(
        &self,
        owner: &Identity,
        draft: ListingDraft,
        uploads: Vec<Upload>,
    ) -> Result<Car, ListingError> {
        let mut car = validate_draft(owner, draft)?;
        if uploads.is_empty() || uploads.len() > MAX_IMAGES {
            return Err(ListingError::ImageCount);
        }
        // Reject bad content types before anything touches the disk.
        if let Some(bad) = uploads
            .iter()
            .find(|u| extension_for(&u.content_type).is_none())
        {
            return Err(ImageStoreError::UnsupportedType(bad.content_type.clone()).into());
        }

        let mut saved: Vec<CarImage> = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            match self.images.save(&upload.bytes, &upload.content_type).await {
                Ok(image) => saved.push(image),
                Err(e) => {
                    self.discard(&saved).await;
                    return Err(e.into());
                }
            }
        }

        car.description = self.describe(&car).await;
        car.images.clone_from(&saved);

        match self.store.create_car(car).await {
            Ok(car) => {
                tracing::info!(car_id = %car.id, "Listing created");
                Ok(car)
            }
            Err(e) => {
                self.discard(&saved).await;
                Err(e.into())
            }
        }
    }

    /// Every listing with its seller, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<CarWithOwner>, ListingError> {
        Ok(self.store.list_cars().await?)
    }

    /// A single listing.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::NotFound` for unknown or malformed ids.
    pub async fn get(&self, id: &str) -> Result<Car, ListingError> {
        let id = id.parse::<CarId>().map_err(|_| ListingError::NotFound)?;
        self.store
            .car_by_id(id)
            .await?
            .ok_or(ListingError::NotFound)
    }

    /// The caller's own listings, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::Repository` if the store fails.
    pub async fn mine(&self, owner: &Identity) -> Result<Vec<Car>, ListingError> {
        Ok(self.store.cars_by_owner(owner.id).await?)
    }

    /// How to reach the seller of a listing.
    ///
    /// # Errors
    ///
    /// Returns `ListingError::NotFound` if the listing or its seller is gone.
    pub async fn seller_contact(&self, id: &str) -> Result<SellerContact, ListingError> {
        let car = self.get(id).await?;
        let seller = self
            .store
            .user_by_id(car.owner)
            .await?
            .ok_or(ListingError::NotFound)?;
        Ok(seller.into())
    }

    /// Find listings resembling the car in a photo.
    ///
    /// # Errors
    ///
    /// - `AssistantUnavailable` if no assistant is configured
    /// - `Image` if the photo type is not accepted
    /// - `Ai` if the assistant fails
    /// - `NoSimilarCars` if nothing matches
    #[instrument(skip_all, fields(bytes = image.len()))]
    pub async fn search_by_image(
        &self,
        image: &[u8],
        content_type: &str,
    ) -> Result<Vec<Car>, ListingError> {
        let assistant = self.assistant.ok_or(ListingError::AssistantUnavailable)?;
        if extension_for(content_type).is_none() {
            return Err(ImageStoreError::UnsupportedType(content_type.to_owned()).into());
        }
        if image.is_empty() {
            return Err(ImageStoreError::Empty.into());
        }

        let analysis = assistant.analyze_image(image, content_type).await?;
        tracing::info!(
            make = analysis.make.as_deref(),
            model = analysis.model.as_deref(),
            year = analysis.year,
            "Image analyzed"
        );

        let cars = self.store.find_similar_cars(&similar_query(&analysis)).await?;
        if cars.is_empty() {
            return Err(ListingError::NoSimilarCars);
        }
        Ok(cars)
    }

    async fn describe(&self, car: &NewCar) -> Option<String> {
        let Some(assistant) = self.assistant else {
            tracing::warn!("No listing assistant configured, skipping description");
            return None;
        };
        let facts = ListingFacts {
            make: car.make.clone(),
            model: car.model.clone(),
            year: car.year,
            mileage: car.mileage,
            condition: car.condition.label().to_owned(),
            engine: car.engine.clone(),
            transmission: car.transmission.clone(),
            color: car.color.clone(),
        };
        match assistant.describe_listing(&facts).await {
            Ok(text) => Some(text.trim().to_owned()).filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Listing description failed, publishing without one");
                None
            }
        }
    }

    async fn discard(&self, images: &[CarImage]) {
        for image in images {
            if let Err(e) = self.images.remove(&image.public_id).await {
                tracing::warn!(public_id = %image.public_id, error = %e, "Failed to remove photo");
            }
        }
    }
}

/// Turn an analysis into search criteria. Unrecognized fields match all.
#[must_use]
pub fn similar_query(analysis: &ImageAnalysis) -> SimilarCarQuery {
    SimilarCarQuery {
        make: analysis.make.clone(),
        model: analysis.model.clone(),
        years: analysis.year_window(),
    }
}

fn validate_draft(owner: &Identity, draft: ListingDraft) -> Result<NewCar, ListingError> {
    let make = required(draft.make, "make")?;
    let model = required(draft.model, "model")?;
    let year = required(draft.year, "year")?;
    let price = required(draft.price, "price")?;
    let mileage = required(draft.mileage, "mileage")?;
    let condition = required(draft.condition, "condition")?;

    let year = year
        .parse::<i32>()
        .ok()
        .filter(|y| (1886..=2100).contains(y))
        .ok_or_else(|| invalid("year", "must be a four-digit model year"))?;
    let price = price
        .parse::<Price>()
        .map_err(|e| invalid("price", &e.to_string()))?;
    let mileage = mileage
        .parse::<i32>()
        .ok()
        .filter(|m| *m >= 0)
        .ok_or_else(|| invalid("mileage", "must be a non-negative whole number"))?;
    let condition = condition
        .parse::<CarCondition>()
        .map_err(|e| invalid("condition", &e.to_string()))?;

    Ok(NewCar {
        owner: owner.id,
        make,
        model,
        year,
        price,
        mileage,
        condition,
        description: None,
        images: Vec::new(),
        engine: optional(draft.engine),
        transmission: optional(draft.transmission),
        color: optional(draft.color),
    })
}

fn invalid(field: &'static str, reason: &str) -> ListingError {
    ListingError::InvalidField {
        field,
        reason: reason.to_owned(),
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ListingError> {
    optional(value).ok_or(ListingError::MissingField(field))
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
