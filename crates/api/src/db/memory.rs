//! In-process store.
//!
//! Holds everything in one mutex-guarded snapshot, so every operation
//! (including the slot check and insert of a booking) is atomic. Used by the
//! test suites and for running the API without a database.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use carmart_core::{CarId, Email, Role, TestDriveId, TestDriveStatus, UserId};

use super::{CarStore, RepositoryError, Store, TestDriveStore, UserStore};
use crate::models::{
    Car, CarWithOwner, NewCar, NewTestDrive, NewUser, SimilarCarQuery, TestDrive,
    TestDriveListing, User, UserChanges, UserSummary,
};

/// Store that keeps all records in memory.
#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<Data>,
}

#[derive(Default)]
struct Data {
    users: Vec<User>,
    cars: Vec<Car>,
    test_drives: Vec<TestDrive>,
    next_user: i32,
    next_car: i32,
    next_test_drive: i32,
}

impl Data {
    fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn car(&self, id: CarId) -> Option<&Car> {
        self.cars.iter().find(|c| c.id == id)
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|u| &u.email == email && Some(u.id) != except)
    }

    fn with_owner(&self, car: &Car) -> Result<CarWithOwner, RepositoryError> {
        let owner = self
            .user(car.owner)
            .ok_or_else(|| RepositoryError::DataCorruption(format!("car {} has no owner", car.id)))?;
        Ok(CarWithOwner {
            car: car.clone(),
            owner: UserSummary::from(owner),
        })
    }

    fn listing(&self, test_drive: &TestDrive) -> Result<TestDriveListing, RepositoryError> {
        let car = self.car(test_drive.car).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("test drive {} has no car", test_drive.id))
        })?;
        let requester = self.user(test_drive.requester).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("test drive {} has no user", test_drive.id))
        })?;
        Ok(TestDriveListing {
            test_drive: test_drive.clone(),
            car: car.summary(),
            requester: UserSummary::from(requester),
        })
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i32)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut data = self.data.lock().await;
        if data.email_taken(&user.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        data.next_user += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::new(data.next_user),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            phone_number: user.phone_number,
            address: user.address,
            created_at: now,
            updated_at: now,
        };
        data.users.push(created.clone());
        Ok(created)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.data.lock().await.user(id).cloned())
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<User, RepositoryError> {
        let mut data = self.data.lock().await;
        if let Some(email) = &changes.email
            && data.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = data
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(phone) = changes.phone_number {
            user.phone_number = Some(phone);
        }
        if let Some(address) = changes.address {
            user.address = Some(address);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_user_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError> {
        let mut data = self.data.lock().await;
        let user = data
            .users
            .iter_mut()
            .find(|u| &u.email == email)
            .ok_or(RepositoryError::NotFound)?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut data = self.data.lock().await;
        let before = data.users.len();
        data.users.retain(|u| u.id != id);
        if data.users.len() == before {
            return Ok(false);
        }

        let owned: Vec<CarId> = data
            .cars
            .iter()
            .filter(|c| c.owner == id)
            .map(|c| c.id)
            .collect();
        data.cars.retain(|c| c.owner != id);
        data.test_drives
            .retain(|t| t.requester != id && !owned.contains(&t.car));
        Ok(true)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users = self.data.lock().await.users.clone();
        newest_first(&mut users, |u| (u.created_at, u.id.as_i32()));
        Ok(users)
    }

    async fn count_users(&self) -> Result<i64, RepositoryError> {
        Ok(i64::try_from(self.data.lock().await.users.len()).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl CarStore for MemoryStore {
    async fn create_car(&self, car: NewCar) -> Result<Car, RepositoryError> {
        let mut data = self.data.lock().await;
        if data.user(car.owner).is_none() {
            return Err(RepositoryError::NotFound);
        }

        data.next_car += 1;
        let now = Utc::now();
        let created = Car {
            id: CarId::new(data.next_car),
            owner: car.owner,
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
            created_at: now,
            updated_at: now,
        };
        data.cars.push(created.clone());
        Ok(created)
    }

    async fn car_by_id(&self, id: CarId) -> Result<Option<Car>, RepositoryError> {
        Ok(self.data.lock().await.car(id).cloned())
    }

    async fn car_with_owner(&self, id: CarId) -> Result<Option<CarWithOwner>, RepositoryError> {
        let data = self.data.lock().await;
        data.car(id).map(|car| data.with_owner(car)).transpose()
    }

    async fn list_cars(&self) -> Result<Vec<CarWithOwner>, RepositoryError> {
        let data = self.data.lock().await;
        let mut cars = data
            .cars
            .iter()
            .map(|car| data.with_owner(car))
            .collect::<Result<Vec<_>, _>>()?;
        newest_first(&mut cars, |c| (c.car.created_at, c.car.id.as_i32()));
        Ok(cars)
    }

    async fn cars_by_owner(&self, owner: UserId) -> Result<Vec<Car>, RepositoryError> {
        let data = self.data.lock().await;
        let mut cars: Vec<Car> = data
            .cars
            .iter()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect();
        newest_first(&mut cars, |c| (c.created_at, c.id.as_i32()));
        Ok(cars)
    }

    async fn find_similar_cars(
        &self,
        query: &SimilarCarQuery,
    ) -> Result<Vec<Car>, RepositoryError> {
        let data = self.data.lock().await;
        let mut cars: Vec<Car> = data
            .cars
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();
        newest_first(&mut cars, |c| (c.created_at, c.id.as_i32()));
        Ok(cars)
    }

    async fn count_cars(&self) -> Result<i64, RepositoryError> {
        Ok(i64::try_from(self.data.lock().await.cars.len()).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl TestDriveStore for MemoryStore {
    async fn insert_test_drive(&self, booking: NewTestDrive) -> Result<TestDrive, RepositoryError> {
        let mut data = self.data.lock().await;
        if data.car(booking.car).is_none() || data.user(booking.requester).is_none() {
            return Err(RepositoryError::NotFound);
        }
        if data
            .test_drives
            .iter()
            .any(|t| t.occupies(booking.car, booking.date, &booking.time_slot))
        {
            return Err(RepositoryError::Conflict("time slot already booked".to_owned()));
        }

        data.next_test_drive += 1;
        let now = Utc::now();
        let created = TestDrive {
            id: TestDriveId::new(data.next_test_drive),
            requester: booking.requester,
            car: booking.car,
            date: booking.date,
            time_slot: booking.time_slot,
            contact_number: booking.contact_number,
            message: booking.message,
            status: TestDriveStatus::Booked,
            created_at: now,
            updated_at: now,
        };
        data.test_drives.push(created.clone());
        Ok(created)
    }

    async fn test_drive_by_id(&self, id: TestDriveId) -> Result<Option<TestDrive>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.test_drives.iter().find(|t| t.id == id).cloned())
    }

    async fn update_test_drive_status(
        &self,
        id: TestDriveId,
        expected: TestDriveStatus,
        next: TestDriveStatus,
    ) -> Result<Option<TestDrive>, RepositoryError> {
        let mut data = self.data.lock().await;
        let Some(test_drive) = data
            .test_drives
            .iter_mut()
            .find(|t| t.id == id && t.status == expected)
        else {
            return Ok(None);
        };
        test_drive.status = next;
        test_drive.updated_at = Utc::now();
        Ok(Some(test_drive.clone()))
    }

    async fn test_drives_for_user(
        &self,
        requester: UserId,
    ) -> Result<Vec<TestDriveListing>, RepositoryError> {
        let data = self.data.lock().await;
        let mut listings = data
            .test_drives
            .iter()
            .filter(|t| t.requester == requester)
            .map(|t| data.listing(t))
            .collect::<Result<Vec<_>, _>>()?;
        listings.sort_by_key(|l| (l.test_drive.created_at, l.test_drive.id));
        Ok(listings)
    }

    async fn list_test_drives(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<TestDriveListing>, RepositoryError> {
        let data = self.data.lock().await;
        let mut listings = data
            .test_drives
            .iter()
            .map(|t| data.listing(t))
            .collect::<Result<Vec<_>, _>>()?;
        newest_first(&mut listings, |l| {
            (l.test_drive.created_at, l.test_drive.id.as_i32())
        });
        if let Some(limit) = limit.and_then(|l| usize::try_from(l).ok()) {
            listings.truncate(limit);
        }
        Ok(listings)
    }

    async fn count_test_drives(&self) -> Result<i64, RepositoryError> {
        Ok(i64::try_from(self.data.lock().await.test_drives.len()).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use carmart_core::{CarCondition, TimeSlot};

    use super::*;

    async fn seed_user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(NewUser {
                name: "Test".to_string(),
                email: Email::parse(email).unwrap(),
                password_hash: "hash".to_string(),
                role: Role::User,
                phone_number: None,
                address: None,
            })
            .await
            .unwrap()
    }

    async fn seed_car(store: &MemoryStore, owner: UserId, make: &str, year: i32) -> Car {
        store
            .create_car(NewCar {
                owner,
                make: make.to_string(),
                model: "Base".to_string(),
                year,
                price: "9999".parse().unwrap(),
                mileage: 10,
                condition: CarCondition::Good,
                description: None,
                images: Vec::new(),
                engine: None,
                transmission: None,
                color: None,
            })
            .await
            .unwrap()
    }

    fn booking(requester: UserId, car: CarId, slot: &str) -> NewTestDrive {
        NewTestDrive {
            requester,
            car,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            time_slot: TimeSlot::parse(slot).unwrap(),
            contact_number: "555".to_string(),
            message: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        seed_user(&store, "a@cars.example").await;
        let err = store
            .create_user(NewUser {
                name: "Other".to_string(),
                email: Email::parse("A@Cars.Example").unwrap(),
                password_hash: "h".to_string(),
                role: Role::User,
                phone_number: None,
                address: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_live_slot_conflicts_until_canceled() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, "buyer@cars.example").await;
        let car = seed_car(&store, buyer.id, "Kia", 2020).await;

        let first = store
            .insert_test_drive(booking(buyer.id, car.id, "10:00 AM"))
            .await
            .unwrap();
        let err = store
            .insert_test_drive(booking(buyer.id, car.id, "10:00 AM"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        store
            .update_test_drive_status(first.id, TestDriveStatus::Booked, TestDriveStatus::Canceled)
            .await
            .unwrap()
            .unwrap();
        store
            .insert_test_drive(booking(buyer.id, car.id, "10:00 AM"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_status_update_is_compare_and_set() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, "cas@cars.example").await;
        let car = seed_car(&store, buyer.id, "Audi", 2018).await;
        let td = store
            .insert_test_drive(booking(buyer.id, car.id, "9:00"))
            .await
            .unwrap();

        let stale = store
            .update_test_drive_status(td.id, TestDriveStatus::Confirmed, TestDriveStatus::Completed)
            .await
            .unwrap();
        assert!(stale.is_none());
        assert_eq!(
            store.test_drive_by_id(td.id).await.unwrap().unwrap().status,
            TestDriveStatus::Booked
        );
    }

    #[tokio::test]
    async fn test_concurrent_inserts_yield_one_booking() {
        let store = Arc::new(MemoryStore::new());
        let buyer = seed_user(&store, "race@cars.example").await;
        let car = seed_car(&store, buyer.id, "BMW", 2022).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let request = booking(buyer.id, car.id, "2:00 PM");
                tokio::spawn(async move { store.insert_test_drive(request).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.count_test_drives().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_user_cascades() {
        let store = MemoryStore::new();
        let seller = seed_user(&store, "seller@cars.example").await;
        let buyer = seed_user(&store, "buyer2@cars.example").await;
        let car = seed_car(&store, seller.id, "Volvo", 2015).await;
        store
            .insert_test_drive(booking(buyer.id, car.id, "noon"))
            .await
            .unwrap();

        assert!(store.delete_user(seller.id).await.unwrap());
        assert_eq!(store.count_cars().await.unwrap(), 0);
        assert!(store.test_drives_for_user(buyer.id).await.unwrap().is_empty());
        assert!(!store.delete_user(seller.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_test_drives_newest_first_with_limit() {
        let store = MemoryStore::new();
        let buyer = seed_user(&store, "list@cars.example").await;
        let car = seed_car(&store, buyer.id, "Saab", 2009).await;
        for slot in ["1", "2", "3"] {
            store
                .insert_test_drive(booking(buyer.id, car.id, slot))
                .await
                .unwrap();
        }

        let recent = store.list_test_drives(Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].test_drive.time_slot.as_str(), "3");

        let mine = store.test_drives_for_user(buyer.id).await.unwrap();
        let slots: Vec<&str> = mine.iter().map(|l| l.test_drive.time_slot.as_str()).collect();
        assert_eq!(slots, ["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_find_similar_cars() {
        let store = MemoryStore::new();
        let seller = seed_user(&store, "sim@cars.example").await;
        seed_car(&store, seller.id, "Toyota", 2019).await;
        seed_car(&store, seller.id, "Toyota", 2010).await;
        seed_car(&store, seller.id, "Honda", 2019).await;

        let found = store
            .find_similar_cars(&SimilarCarQuery {
                make: Some("toy".to_string()),
                model: None,
                years: Some((2017, 2021)),
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].year, 2019);
    }
}
