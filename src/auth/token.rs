use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

const RANDOM_LEN: usize = 14;

/// Mints an opaque session token: hex SHA-256 of username, nanosecond
/// timestamp and a random string.
pub fn generate(username: &str) -> String {
    let nonce: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_LEN)
        .map(char::from)
        .collect();
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();

    let mut hasher = Sha256::new();
    hasher.update(format!("{username}-{nanos}-{nonce}").as_bytes());
    hex::encode(hasher.finalize())
}
