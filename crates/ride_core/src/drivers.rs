//! Driver directory: the fixed pool of drivers a booking can be assigned to.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RideError;
use crate::random::RandomSource;

/// Static driver profile. Shared read-only between rides via `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: u32,
    pub name: String,
    pub vehicle_description: String,
    pub plate: String,
    /// Average rating in `[0, 5]`.
    pub rating: f64,
    pub trip_count: u32,
    pub photo_ref: String,
}

impl Driver {
    fn validate(&self) -> Result<(), RideError> {
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(RideError::Validation(format!(
                "driver {} rating {} outside [0, 5]",
                self.id, self.rating
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DriverDirectory {
    drivers: Vec<Arc<Driver>>,
}

impl DriverDirectory {
    /// Build a directory, rejecting drivers whose rating is outside `[0, 5]`.
    pub fn new(drivers: Vec<Driver>) -> Result<Self, RideError> {
        for driver in &drivers {
            driver.validate()?;
        }
        Ok(Self {
            drivers: drivers.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The demo fleet shipped with the booking app.
    pub fn with_demo_fleet() -> Self {
        let drivers = [
            (1, "John Smith", "Toyota Camry (Silver)", "ABC 1234", 4.8, 1243, "drivers/john.jpg"),
            (2, "Maria Garcia", "Honda Accord (Black)", "XYZ 5678", 4.9, 2156, "drivers/maria.jpg"),
            (3, "David Chen", "Tesla Model 3 (White)", "EV 9012", 4.7, 876, "drivers/david.jpg"),
            (4, "Sarah Johnson", "Ford Fusion (Blue)", "LMN 3456", 4.6, 1532, "drivers/sarah.jpg"),
            (5, "Ahmed Hassan", "Hyundai Sonata (Gray)", "QRS 7890", 4.9, 3021, "drivers/ahmed.jpg"),
        ];
        Self {
            drivers: drivers
                .into_iter()
                .map(|(id, name, vehicle, plate, rating, trips, photo)| {
                    Arc::new(Driver {
                        id,
                        name: name.to_string(),
                        vehicle_description: vehicle.to_string(),
                        plate: plate.to_string(),
                        rating,
                        trip_count: trips,
                        photo_ref: photo.to_string(),
                    })
                })
                .collect(),
        }
    }

    pub fn drivers(&self) -> &[Arc<Driver>] {
        &self.drivers
    }

    pub fn get(&self, id: u32) -> Option<&Arc<Driver>> {
        self.drivers.iter().find(|driver| driver.id == id)
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn assign_random(&self, rng: &mut dyn RandomSource) -> Result<Arc<Driver>, RideError> {
        assign_random_driver(&self.drivers, rng)
    }
}

/// Uniform random pick from `pool`.
pub fn assign_random_driver(
    pool: &[Arc<Driver>],
    rng: &mut dyn RandomSource,
) -> Result<Arc<Driver>, RideError> {
    let index = rng
        .choose_index(pool.len())
        .ok_or(RideError::NoDriversAvailable)?;
    let driver = Arc::clone(&pool[index]);
    debug!(driver_id = driver.id, pool_size = pool.len(), "driver picked");
    Ok(driver)
}
