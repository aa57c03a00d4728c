pub mod cache;
pub mod loader;
pub mod controller;
pub mod coordinator;
pub mod session;

pub use cache::{shared_cache, AgencyPackageCache, SharedPackageCache};
pub use loader::{FetchOutcome, PackageLoader};
pub use controller::{DepartureWorkflow, PackageWorkflow, WorkflowController};
pub use coordinator::{MutationCoordinator, MutationError, MutationResult};
pub use session::{ConsoleSession, SubmitError};
