//! Resource pools for group concurrency control.
//!
//! Three independent semaphore-backed pools bound the work of all group
//! workers in a run:
//!
//! - [`ResourceType::Download`]: one permit per scene transfer attempt
//! - [`ResourceType::Process`]: one permit per group for its whole processor chain
//! - [`ResourceType::Adapt`]: one permit per group for its whole adapter chain
//!
//! Capacities are fixed at construction and never resized. Pools do not
//! order waiters beyond the semaphore's FIFO queue; the spawn order chosen
//! by the scheduler is the only ordering across groups.
//!
//! # Example
//!
//! ```ignore
//! use sencast::executor::{PoolCapacities, ResourcePools, ResourceType};
//!
//! let pools = ResourcePools::new(PoolCapacities::new(2, 1, 1));
//!
//! let permit = pools.acquire(ResourceType::Process).await;
//! // Run the processor chain...
//! drop(permit);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ConcurrencySettings;

/// The three bounded resources a group worker competes for.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ResourceType {
    /// Level-1 product transfers.
    Download,

    /// Processor chains (native toolkits, typically CPU and memory bound).
    Process,

    /// Adapter chains (exports, quicklooks, uploads).
    Adapt,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Process => write!(f, "process"),
            Self::Adapt => write!(f, "adapt"),
        }
    }
}

/// A semaphore-backed pool for a single resource type.
///
/// Tracks in-flight permits and the peak observed, so callers can verify
/// the bound actually held during a run.
#[derive(Debug)]
pub struct ResourcePool {
    resource_type: ResourceType,
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ResourcePool {
    /// Creates a pool with the given capacity (at least one permit).
    pub fn new(resource_type: ResourceType, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            resource_type,
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Acquires a permit, waiting until one is free.
    ///
    /// Pools are never closed, so this only waits.
    pub async fn acquire(&self) -> ResourcePermit<'_> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore closed unexpectedly");

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        ResourcePermit {
            _permit: permit,
            in_flight: &self.in_flight,
            resource_type: self.resource_type,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of available permits.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Returns the current number of held permits.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns the highest number of simultaneously held permits.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// A permit from a resource pool, released on drop.
pub struct ResourcePermit<'a> {
    _permit: OwnedSemaphorePermit,
    in_flight: &'a AtomicUsize,
    resource_type: ResourceType,
}

impl ResourcePermit<'_> {
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }
}

impl Drop for ResourcePermit<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for ResourcePermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePermit")
            .field("resource_type", &self.resource_type)
            .finish()
    }
}

/// Capacities of the three pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolCapacities {
    pub download: usize,
    pub process: usize,
    pub adapt: usize,
}

impl PoolCapacities {
    pub fn new(download: usize, process: usize, adapt: usize) -> Self {
        Self {
            download,
            process,
            adapt,
        }
    }
}

impl Default for PoolCapacities {
    fn default() -> Self {
        Self::from(&ConcurrencySettings::default())
    }
}

impl From<&ConcurrencySettings> for PoolCapacities {
    fn from(settings: &ConcurrencySettings) -> Self {
        Self {
            download: settings.max_parallel_downloads,
            process: settings.max_parallel_processors,
            adapt: settings.max_parallel_adapters,
        }
    }
}

/// The download, process and adapt pools shared by every group worker.
pub struct ResourcePools {
    download: ResourcePool,
    process: ResourcePool,
    adapt: ResourcePool,
}

impl ResourcePools {
    pub fn new(capacities: PoolCapacities) -> Self {
        Self {
            download: ResourcePool::new(ResourceType::Download, capacities.download),
            process: ResourcePool::new(ResourceType::Process, capacities.process),
            adapt: ResourcePool::new(ResourceType::Adapt, capacities.adapt),
        }
    }

    /// Returns the pool for the given resource type.
    pub fn get(&self, resource_type: ResourceType) -> &ResourcePool {
        match resource_type {
            ResourceType::Download => &self.download,
            ResourceType::Process => &self.process,
            ResourceType::Adapt => &self.adapt,
        }
    }

    /// Acquires a permit from the specified pool, waiting if it is at capacity.
    pub async fn acquire(&self, resource_type: ResourceType) -> ResourcePermit<'_> {
        self.get(resource_type).acquire().await
    }

    pub fn capacity(&self, resource_type: ResourceType) -> usize {
        self.get(resource_type).capacity()
    }

    pub fn in_flight(&self, resource_type: ResourceType) -> usize {
        self.get(resource_type).in_flight()
    }

    pub fn peak_in_flight(&self, resource_type: ResourceType) -> usize {
        self.get(resource_type).peak_in_flight()
    }
}

impl fmt::Debug for ResourcePools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePools")
            .field(
                "download",
                &format_args!("{}/{}", self.download.in_flight(), self.download.capacity()),
            )
            .field(
                "process",
                &format_args!("{}/{}", self.process.in_flight(), self.process.capacity()),
            )
            .field(
                "adapt",
                &format_args!("{}/{}", self.adapt.in_flight(), self.adapt.capacity()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_resource_type_display() {
        assert_eq!(format!("{}", ResourceType::Download), "download");
        assert_eq!(format!("{}", ResourceType::Process), "process");
        assert_eq!(format!("{}", ResourceType::Adapt), "adapt");
    }

    #[test]
    fn test_resource_pool_creation() {
        let pool = ResourcePool::new(ResourceType::Download, 3);
        assert_eq!(pool.resource_type(), ResourceType::Download);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.peak_in_flight(), 0);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let pool = ResourcePool::new(ResourceType::Process, 0);
        assert_eq!(pool.capacity(), 1);
    }

    #[tokio::test]
    async fn test_resource_pool_acquire_release() {
        let pool = ResourcePool::new(ResourceType::Download, 2);

        let permit1 = pool.acquire().await;
        assert_eq!(pool.in_flight(), 1);
        assert_eq!(pool.available(), 1);

        let permit2 = pool.acquire().await;
        assert_eq!(pool.in_flight(), 2);
        assert_eq!(pool.available(), 0);

        drop(permit1);
        assert_eq!(pool.in_flight(), 1);

        drop(permit2);
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.available(), 2);
        assert_eq!(pool.peak_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let pool = ResourcePool::new(ResourceType::Adapt, 1);

        let permit = pool.acquire().await;
        let blocked = tokio::time::timeout(Duration::from_millis(20), pool.acquire()).await;
        assert!(blocked.is_err());

        drop(permit);
        let again = tokio::time::timeout(Duration::from_millis(20), pool.acquire()).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_pools_are_independent() {
        let pools = ResourcePools::new(PoolCapacities::new(1, 1, 1));

        let download = pools.acquire(ResourceType::Download).await;
        assert_eq!(pools.get(ResourceType::Download).available(), 0);
        let _process = pools.acquire(ResourceType::Process).await;
        let _adapt = pools.acquire(ResourceType::Adapt).await;
        assert_eq!(pools.in_flight(ResourceType::Process), 1);
        assert_eq!(pools.in_flight(ResourceType::Adapt), 1);

        drop(download);
        assert_eq!(pools.in_flight(ResourceType::Download), 0);
    }

    #[test]
    fn test_capacities_from_settings() {
        let settings = ConcurrencySettings {
            max_parallel_downloads: 4,
            max_parallel_processors: 2,
            max_parallel_adapters: 3,
        };
        let pools = ResourcePools::new(PoolCapacities::from(&settings));

        assert_eq!(pools.capacity(ResourceType::Download), 4);
        assert_eq!(pools.capacity(ResourceType::Process), 2);
        assert_eq!(pools.capacity(ResourceType::Adapt), 3);
    }

    #[test]
    fn test_pools_debug() {
        let pools = ResourcePools::new(PoolCapacities::default());
        let debug = format!("{:?}", pools);
        assert!(debug.contains("ResourcePools"));
        assert!(debug.contains("download"));
        assert!(debug.contains("adapt"));
    }
}
