// Protected handlers run behind the auth gate and read the caller from
// `Extension<AuthUser>`. Resume access is always scoped to that caller.
pub mod applies;
pub mod board;
pub mod users;
