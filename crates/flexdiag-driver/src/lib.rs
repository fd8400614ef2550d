pub mod backend_driver;
pub mod driver_trait;
pub mod harness;
pub mod null_driver;
pub mod registry;

pub use backend_driver::BackendDriver;
pub use driver_trait::{AsioCallbacks, AsioDriver};
pub use harness::{init_and_run, Harness, Outcome, Step};
pub use null_driver::NullDriver;
pub use registry::{DriverFactory, DriverRegistry};
