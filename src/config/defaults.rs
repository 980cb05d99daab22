use rand::RngCore;

pub(super) const LOG_LEVELS: [&str; 4] = ["error", "warn", "info", "debug"];

pub(super) fn empty_string() -> String {
    String::new()
}

pub(super) fn log_level() -> String {
    String::from("info")
}

pub(super) fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
