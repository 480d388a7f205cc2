pub mod todo;
pub mod user;

pub use todo::{CategoryQuery, NewTodoRequest, Priority, StatusResponse, Todo, UpdateTodoRequest};
pub use user::{
    AccessTokenResponse, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    RegisterResponse, TokenPair, UpdateProfileRequest, User, UserProfile,
};
