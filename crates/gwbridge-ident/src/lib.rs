//! Socket and session identities and their packed wire forms.
//!
//! Both identities travel inside every chunk, so their bit layouts are part
//! of the gateway/host contract. Layouts are defined once, by the `pack_*`
//! and `unpack_*` functions in [`socket`] and [`session`]; nothing here relies
//! on struct layout.

pub mod error;
pub mod session;
pub mod socket;

pub use error::{IdentityError, Result};
pub use session::{
    find_session_cookie, parse_cookie_string, session_cookie_range, SessionIdentity,
    INVALID_SCHEDULER_ID, INVALID_SESSION_INDEX, INVALID_SESSION_SALT, SESSION_COOKIE_NAME,
    SESSION_STRING_LEN,
};
pub use socket::SocketIdentity;
