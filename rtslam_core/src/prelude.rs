// rtslam_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::map::JointMap;
pub use crate::models::motion::{ContinuousDynamics, MotionModel, MotionPrediction};
pub use crate::sensor::{Sensor, SensorContext};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::control::Control;
pub use crate::error::{FilterError, Result};
pub use crate::gaussian::Gaussian;
pub use crate::map::{JointState, SlamMap};
pub use crate::robot::Robot;
pub use crate::sensor::SensorRegistry;
pub use crate::types::{MapId, MapLink, ObjectHandle, RobotHandle, SensorHandle, Slot};

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::models::motion::{EulerDiscretization, LinearMotion, VelocityIntegrator};
