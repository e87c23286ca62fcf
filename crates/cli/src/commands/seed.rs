//! Seed the database with demo accounts and listings.
//!
//! Reads a YAML file of accounts, each with the cars it sells. Accounts
//! whose email is already registered are skipped together with their cars,
//! so the command can be re-run safely.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use carmart_api::db::{CarStore, PgStore, UserStore};
use carmart_api::models::{CarImage, NewCar};
use carmart_api::services::auth::{AuthService, Registration};
use carmart_core::{CarCondition, Email, Price, Role};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub users: Vec<SeedUser>,
}

/// An account and the cars it sells.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub cars: Vec<SeedCar>,
}

/// A listing to create for its seller.
#[derive(Debug, Deserialize)]
pub struct SeedCar {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: String,
    pub mileage: i32,
    pub condition: String,
    pub description: Option<String>,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub images: Vec<CarImage>,
}

/// Parse a seed file and check every value before touching the database.
///
/// # Errors
///
/// Returns a description of the first invalid entry.
pub fn parse_seed(content: &str) -> Result<SeedFile, Box<dyn std::error::Error>> {
    let seed: SeedFile = serde_yaml::from_str(content)?;
    for user in &seed.users {
        Email::parse(&user.email).map_err(|e| format!("{}: {e}", user.email))?;
        for car in &user.cars {
            let label = format!("{} {} {}", car.year, car.make, car.model);
            car.price
                .parse::<Price>()
                .map_err(|e| format!("{label}: {e}"))?;
            car.condition
                .parse::<CarCondition>()
                .map_err(|e| format!("{label}: {e}"))?;
        }
    }
    Ok(seed)
}

/// Load demo data from `file_path`.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or if the database
/// rejects an insert.
pub async fn demo_data(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed data from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed = parse_seed(&content)?;
    info!(users = seed.users.len(), "Parsed seed file");

    let store = PgStore::new(super::connect().await?);
    let auth = AuthService::new(&store);

    let (mut users_created, mut users_skipped, mut cars_created) = (0, 0, 0);
    for user in seed.users {
        let email = Email::parse(&user.email)?;
        if store.user_by_email(&email).await?.is_some() {
            warn!(email = %email, "Account exists, skipping it and its cars");
            users_skipped += 1;
            continue;
        }

        let role = if user.admin { Role::Admin } else { Role::User };
        let account = auth
            .create_account(
                Registration {
                    name: Some(user.name),
                    email: Some(user.email),
                    password: Some(user.password),
                    phone_number: user.phone_number,
                    address: user.address,
                },
                role,
            )
            .await?;
        users_created += 1;

        for car in user.cars {
            store
                .create_car(NewCar {
                    owner: account.id,
                    make: car.make,
                    model: car.model,
                    year: car.year,
                    price: car.price.parse()?,
                    mileage: car.mileage,
                    condition: car.condition.parse()?,
                    description: car.description,
                    images: car.images,
                    engine: car.engine,
                    transmission: car.transmission,
                    color: car.color,
                })
                .await?;
            cars_created += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Accounts created: {users_created}");
    info!("  Accounts skipped (already exist): {users_skipped}");
    info!("  Listings created: {cars_created}");
    Ok(())
}
