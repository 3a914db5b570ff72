/// Account row
pub mod account;

/// Form inputs and their validation
pub mod inputs;

/// Table access
pub mod repository;

/// Sign-up, sign-in and profile operations
pub mod service;

pub use account::{compose_address, Account, ENTITY, PROFILE_COLUMNS};
pub use inputs::{ProfileInput, SignInInput, SignUpInput};
pub use repository::{AccountRepository, DynamoAccountRepository};
pub use service::AccountService;
