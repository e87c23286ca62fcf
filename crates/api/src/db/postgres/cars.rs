//! Listing queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use carmart_core::{CarCondition, CarId, Email, Price, UserId};

use super::{PgStore, escape_like};
use crate::db::{CarStore, RepositoryError};
use crate::models::{Car, CarImage, CarWithOwner, NewCar, SimilarCarQuery, UserSummary};

macro_rules! car_columns {
    () => {
        "c.id, c.user_id, c.make, c.model, c.year, c.price, c.mileage, c.condition, \
         c.description, c.images, c.engine, c.transmission, c.color, c.created_at, c.updated_at"
    };
}

#[derive(sqlx::FromRow)]
struct CarRow {
    id: i32,
    user_id: i32,
    make: String,
    model: String,
    year: i32,
    price: Decimal,
    mileage: i32,
    condition: String,
    description: Option<String>,
    images: Json<Vec<CarImage>>,
    engine: Option<String>,
    transmission: Option<String>,
    color: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CarRow> for Car {
    type Error = RepositoryError;

    fn try_from(row: CarRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price in database: {e}"))
        })?;
        let condition = row.condition.parse::<CarCondition>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid condition in database: {e}"))
        })?;

        Ok(Self {
            id: CarId::new(row.id),
            owner: UserId::new(row.user_id),
            make: row.make,
            model: row.model,
            year: row.year,
            price,
            mileage: row.mileage,
            condition,
            description: row.description,
            images: row.images.0,
            engine: row.engine,
            transmission: row.transmission,
            color: row.color,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CarWithOwnerRow {
    #[sqlx(flatten)]
    car: CarRow,
    owner_name: String,
    owner_email: String,
}

impl TryFrom<CarWithOwnerRow> for CarWithOwner {
    type Error = RepositoryError;

    fn try_from(row: CarWithOwnerRow) -> Result<Self, Self::Error> {
        let car = Car::try_from(row.car)?;
        let email = Email::parse(&row.owner_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            owner: UserSummary {
                id: car.owner,
                name: row.owner_name,
                email,
            },
            car,
        })
    }
}

#[async_trait]
impl CarStore for PgStore {
    async fn create_car(&self, car: NewCar) -> Result<Car, RepositoryError> {
        let row = sqlx::query_as::<_, CarRow>(concat!(
            "INSERT INTO carmart.cars AS c \
                 (user_id, make, model, year, price, mileage, condition, description, \
                  images, engine, transmission, color) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING ",
            car_columns!()
        ))
        .bind(car.owner)
        .bind(&car.make)
        .bind(&car.model)
        .bind(car.year)
        .bind(car.price.amount())
        .bind(car.mileage)
        .bind(car.condition.label())
        .bind(car.description.as_deref())
        .bind(Json(&car.images))
        .bind(car.engine.as_deref())
        .bind(car.transmission.as_deref())
        .bind(car.color.as_deref())
        .fetch_one(self.pool())
        .await?;

        row.try_into()
    }

    async fn car_by_id(&self, id: CarId) -> Result<Option<Car>, RepositoryError> {
        sqlx::query_as::<_, CarRow>(concat!(
            "SELECT ",
            car_columns!(),
            " FROM carmart.cars c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .map(Car::try_from)
        .transpose()
    }

    async fn car_with_owner(&self, id: CarId) -> Result<Option<CarWithOwner>, RepositoryError> {
        sqlx::query_as::<_, CarWithOwnerRow>(concat!(
            "SELECT ",
            car_columns!(),
            ", u.name AS owner_name, u.email AS owner_email \
             FROM carmart.cars c JOIN carmart.users u ON u.id = c.user_id \
             WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .map(CarWithOwner::try_from)
        .transpose()
    }

    async fn list_cars(&self) -> Result<Vec<CarWithOwner>, RepositoryError> {
        sqlx::query_as::<_, CarWithOwnerRow>(concat!(
            "SELECT ",
            car_columns!(),
            ", u.name AS owner_name, u.email AS owner_email \
             FROM carmart.cars c JOIN carmart.users u ON u.id = c.user_id \
             ORDER BY c.created_at DESC, c.id DESC"
        ))
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(CarWithOwner::try_from)
        .collect()
    }

    async fn cars_by_owner(&self, owner: UserId) -> Result<Vec<Car>, RepositoryError> {
        sqlx::query_as::<_, CarRow>(concat!(
            "SELECT ",
            car_columns!(),
            " FROM carmart.cars c WHERE c.user_id = $1 ORDER BY c.created_at DESC, c.id DESC"
        ))
        .bind(owner)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(Car::try_from)
        .collect()
    }

    async fn find_similar_cars(
        &self,
        query: &SimilarCarQuery,
    ) -> Result<Vec<Car>, RepositoryError> {
        let (low, high) = query.years.unzip();
        sqlx::query_as::<_, CarRow>(concat!(
            "SELECT ",
            car_columns!(),
            r" FROM carmart.cars c
               WHERE ($1::text IS NULL OR c.make ILIKE '%' || $1 || '%' ESCAPE '\')
                 AND ($2::text IS NULL OR c.model ILIKE '%' || $2 || '%' ESCAPE '\')
                 AND ($3::int IS NULL OR c.year BETWEEN $3 AND $4)
               ORDER BY c.created_at DESC, c.id DESC"
        ))
        .bind(query.make.as_deref().map(escape_like))
        .bind(query.model.as_deref().map(escape_like))
        .bind(low)
        .bind(high)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(Car::try_from)
        .collect()
    }

    async fn count_cars(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM carmart.cars")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
