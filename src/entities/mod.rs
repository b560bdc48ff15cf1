pub mod credit_request;
pub mod used_invite_link;
