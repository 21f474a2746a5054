//! The backend's endpoints.
//!
//! Each function builds the path, method and body for one operation and
//! hands it to [`ApiClient::request()`](crate::ApiClient::request).

mod analyses;
mod hives;
mod login;
mod logout;
mod register;

pub use analyses::{
    create_hive_analysis, list_hive_analyses, HiveAnalysis, NewHiveAnalysis,
    ANALYSES_PATH,
};
pub use hives::{
    create_hive, delete_hive, get_all_hives, update_hive, DeleteHiveOptions,
    Hive, HivePatch, NewHive,
};
pub use login::{login, login_root, Credentials, LoginResponse, LOGIN_PATH};
pub use logout::logout;
pub use register::{register_root, NewRootUser, REGISTER_PATH};
