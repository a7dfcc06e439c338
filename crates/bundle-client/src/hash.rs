use digest::DynDigest;
use sha1::Sha1;
use sha2::{Sha224, Sha256};

/// Hash algorithm names this crate knows how to compute, independent of
/// whatever the server's index happens to offer.
const SUPPORTED: &[&str] = &["sha224", "sha256", "sha1"];

pub fn supported(name: &str) -> bool {
    SUPPORTED.contains(&name)
}

/// Builds a boxed, object-safe hasher for `name`. `name` must be one
/// [`supported`] reports `true` for.
pub fn new_hasher(name: &str) -> Box<dyn DynDigest> {
    match name {
        "sha256" => Box::new(Sha256::default()),
        "sha1" => Box::new(Sha1::default()),
        _ => Box::new(Sha224::default()),
    }
}

/// Picks a hash algorithm to verify a download with: the first name in
/// `preference` present in `available`, falling back to the first
/// `available` entry this crate supports at all.
pub fn choose_algorithm<'a>(preference: &[String], available: &'a std::collections::BTreeMap<String, String>) -> Option<&'a str> {
    for name in preference {
        if let Some((key, _)) = available.get_key_value(name.as_str()) {
            return Some(key.as_str());
        }
    }
    available.keys().find(|name| supported(name)).map(String::as_str)
}
