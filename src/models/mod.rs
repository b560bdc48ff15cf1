pub mod credit_request;
