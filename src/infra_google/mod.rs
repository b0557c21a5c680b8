mod identity_provider_google;

pub use identity_provider_google::*;
