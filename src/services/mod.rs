pub mod password;

pub mod token;
pub use token::{JwtTokenIssuer, TOKEN_TYPE, TokenIssuer};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, Registration};
pub use auth_service_impl::SeaOrmAuthService;

pub mod member_service;
pub mod member_service_impl;
pub use member_service::{MemberError, MemberLookup, MemberService};
pub use member_service_impl::SeaOrmMemberService;

pub mod avatar;
pub use avatar::{AvatarService, AvatarUpload};
