mod app_data_dir;

pub use app_data_dir::{app_data_dir, remote_dir, state_dir};

/// File name for a per-user document. Anything outside `[A-Za-z0-9._-]` is
/// replaced so user ids cannot escape the directory.
pub(crate) fn user_file_name(user_id: &tg_core::UserId, extension: &str) -> String {
    let stem: String = user_id
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = match stem.trim_matches('.') {
        "" => "_",
        trimmed => trimmed,
    };
    format!("{stem}.{extension}")
}
