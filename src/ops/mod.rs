pub mod contact_ops;
pub mod identify_ops;
