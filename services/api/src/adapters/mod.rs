pub mod db;
pub mod employer_api;
pub mod sample_jobs;

pub use db::DbAdapter;
pub use employer_api::HttpJobSource;
pub use sample_jobs::StaticJobSource;
