//! Fleet registry keyed by robot id

use robofleet_shared::{ErrorCode, RobotSnapshot};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

/// Errors returned by registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Robot not found")]
    NotFound { id: String },

    #[error("Name and type are required")]
    MissingFields,
}

impl RegistryError {
    /// Wire error class for this failure
    pub fn code(&self) -> ErrorCode {
        match self {
            RegistryError::NotFound { .. } => ErrorCode::NotFound,
            RegistryError::MissingFields => ErrorCode::BadRequest,
        }
    }
}

struct RobotEntry {
    /// Registration order
    seq: u64,
    snapshot: Arc<Mutex<RobotSnapshot>>,
}

/// Owns the snapshot of every registered robot.
///
/// Each robot sits behind its own lock, so updates to one robot are applied
/// one at a time while other robots stay available.
pub struct FleetRegistry {
    robots: RwLock<HashMap<String, RobotEntry>>,
    next_seq: AtomicU64,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self {
            robots: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Register a new idle, fully charged robot
    pub async fn register(
        &self,
        name: Option<String>,
        robot_type: Option<String>,
        location: Option<String>,
    ) -> Result<RobotSnapshot, RegistryError> {
        let (name, robot_type) = match (non_empty(name), non_empty(robot_type)) {
            (Some(name), Some(robot_type)) => (name, robot_type),
            _ => return Err(RegistryError::MissingFields),
        };

        let robot = RobotSnapshot::new(
            Uuid::new_v4().to_string(),
            name,
            robot_type,
            non_empty(location),
        );
        let entry = RobotEntry {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            snapshot: Arc::new(Mutex::new(robot.clone())),
        };

        self.robots.write().await.insert(robot.id.clone(), entry);
        info!("Registered new robot: {} ({})", robot.name, robot.id);
        Ok(robot)
    }

    /// All robots, in registration order
    pub async fn list(&self) -> Vec<RobotSnapshot> {
        let mut entries: Vec<(u64, Arc<Mutex<RobotSnapshot>>)> = {
            let robots = self.robots.read().await;
            robots
                .values()
                .map(|e| (e.seq, e.snapshot.clone()))
                .collect()
        };
        entries.sort_by_key(|(seq, _)| *seq);

        let mut list = Vec::with_capacity(entries.len());
        for (_, snapshot) in entries {
            list.push(snapshot.lock().await.clone());
        }
        list
    }

    pub async fn get(&self, id: &str) -> Result<RobotSnapshot, RegistryError> {
        let snapshot = self.slot(id).await?;
        let robot = snapshot.lock().await.clone();
        Ok(robot)
    }

    /// Run `f` against a robot's snapshot while holding that robot's lock
    pub async fn update<T, F>(&self, id: &str, f: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut RobotSnapshot) -> T,
    {
        let snapshot = self.slot(id).await?;
        let mut guard = snapshot.lock().await;
        Ok(f(&mut *guard))
    }

    pub async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        match self.robots.write().await.remove(id) {
            Some(_) => {
                info!("Deleted robot {}", id);
                Ok(())
            }
            None => Err(RegistryError::NotFound { id: id.to_string() }),
        }
    }

    pub async fn count(&self) -> usize {
        self.robots.read().await.len()
    }

    async fn slot(&self, id: &str) -> Result<Arc<Mutex<RobotSnapshot>>, RegistryError> {
        self.robots
            .read()
            .await
            .get(id)
            .map(|e| e.snapshot.clone())
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
