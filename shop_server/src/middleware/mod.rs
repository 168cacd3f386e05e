mod acl;
mod hmac;
mod session;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService, GATEWAY_SIGNATURE_HEADER};
pub use session::{SessionMiddlewareFactory, SessionMiddlewareService};
