//! Listing routes, including multipart uploads and search-by-image.

use axum::{
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartRejection},
    },
    http::StatusCode,
};

use crate::error::{ApiJson, AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Car, CarView, SellerName};
use crate::services::images::MAX_IMAGE_BYTES;
use crate::services::listings::{ListingDraft, ListingService, SellerContact, Upload};
use crate::state::AppState;

/// Multipart field carrying listing photos (repeated).
const IMAGES_FIELD: &str = "images";

/// Multipart field carrying the photo to search by.
const SEARCH_IMAGE_FIELD: &str = "image";

fn listings(state: &AppState) -> ListingService<'_> {
    ListingService::new(state.store(), state.images(), state.assistant())
}

/// GET /api/cars
///
/// # Errors
///
/// 500 if the store fails.
pub async fn index(State(state): State<AppState>) -> Result<ApiJson<Vec<CarView<SellerName>>>> {
    let cars = listings(&state).list().await?;
    Ok(ApiJson(
        cars.into_iter().map(|c| c.into_public_view()).collect(),
    ))
}

/// GET /api/cars/{id}
///
/// # Errors
///
/// 404 if the listing does not exist.
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiJson<Car>> {
    Ok(ApiJson(listings(&state).get(&id).await?))
}

/// GET /api/cars/my
///
/// # Errors
///
/// 401 without a valid credential.
pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<ApiJson<Vec<Car>>> {
    Ok(ApiJson(listings(&state).mine(&identity).await?))
}

/// GET /api/cars/{id}/contact
///
/// # Errors
///
/// 401 without a valid credential, 404 if the listing does not exist.
pub async fn contact(
    State(state): State<AppState>,
    RequireAuth(_identity): RequireAuth,
    Path(id): Path<String>,
) -> Result<ApiJson<SellerContact>> {
    Ok(ApiJson(listings(&state).seller_contact(&id).await?))
}

/// POST /api/cars (multipart)
///
/// Text fields `make`, `model`, `year`, `price`, `mileage`, `condition`,
/// `engine`, `transmission`, `color`, plus 1 to 5 `images` files.
///
/// # Errors
///
/// 400 for invalid fields or photos, 401 without a valid credential.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, ApiJson<Car>)> {
    let mut multipart = multipart?;
    let mut draft = ListingDraft::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        if name == IMAGES_FIELD {
            uploads.push(read_upload(field).await?);
            continue;
        }

        let slot = match name.as_str() {
            "make" => &mut draft.make,
            "model" => &mut draft.model,
            "year" => &mut draft.year,
            "price" => &mut draft.price,
            "mileage" => &mut draft.mileage,
            "condition" => &mut draft.condition,
            "engine" => &mut draft.engine,
            "transmission" => &mut draft.transmission,
            "color" => &mut draft.color,
            _ => {
                tracing::debug!(field = %name, "Ignoring unknown listing field");
                continue;
            }
        };
        *slot = Some(field.text().await?);
    }

    let car = listings(&state).create(&identity, draft, uploads).await?;
    Ok((StatusCode::CREATED, ApiJson(car)))
}

/// POST /api/cars/search-by-image (multipart, field `image`)
///
/// # Errors
///
/// 400 without a usable photo, 404 when nothing matches, 502 when the AI
/// call fails, 503 when AI is not configured.
pub async fn search_by_image(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<ApiJson<Vec<Car>>> {
    let mut multipart = multipart?;
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(SEARCH_IMAGE_FIELD) {
            image = Some(read_upload(field).await?);
            break;
        }
    }
    let image =
        image.ok_or_else(|| AppError::BadRequest("Please upload an image file.".to_string()))?;

    let cars = listings(&state)
        .search_by_image(&image.bytes, &image.content_type)
        .await?;
    Ok(ApiJson(cars))
}

async fn read_upload(field: Field<'_>) -> Result<Upload> {
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_owned();
    let bytes = field.bytes().await?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(format!(
            "Each image must be at most {} MiB",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(Upload {
        bytes: bytes.to_vec(),
        content_type,
    })
}
