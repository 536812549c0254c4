//! Services built on the repository traits
//!
//! - [`AccountGuard`]: login, password update and account creation under the lockout policy
//! - [`LoginLockoutService`]: failure counting and lockout decisions
//! - [`AccountService`]: account lookups and profile updates
//! - [`SessionService`]: session lifecycle, and [`SessionBinding`] to plug it into the guard

pub mod account;
pub mod guard;
pub mod lockout;
pub mod session;

pub use account::AccountService;
pub use guard::AccountGuard;
pub use lockout::LoginLockoutService;
pub use session::{SessionBinding, SessionService};
