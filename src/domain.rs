mod email_address;
mod required_field;

pub use email_address::EmailAddress;
pub use required_field::RequiredField;
