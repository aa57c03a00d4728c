pub mod app_config;
pub mod http;
pub mod package_repo;
pub mod departure_repo;
pub mod memory;

pub use app_config::Config;
pub use http::ApiClient;
pub use package_repo::HttpPackageRepository;
pub use departure_repo::HttpDepartureRepository;
pub use memory::{InMemoryDepartureRepository, InMemoryPackageRepository};
