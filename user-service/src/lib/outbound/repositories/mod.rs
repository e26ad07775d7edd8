pub mod token;
pub mod user;

pub use token::InMemoryTokenStore;
pub use user::InMemoryUserRepository;
