pub mod coordinates;
pub mod route;
pub mod stop;

pub use coordinates::{distance_km, Coordinates};
pub use route::{MapRegion, OptimizedRoute, RouteStep, TimedRoute};
pub use stop::{AppointmentStatus, FarrierProfile, Stop};
